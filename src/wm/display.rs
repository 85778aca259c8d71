//! Display Module
//!
//! The X11 side of [`DisplaySession`]: owns the connection, interned atoms,
//! cursors and the keyboard mapping, and turns raw protocol events into
//! [`WmEvent`]s.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::shared::Geometry;
use crate::wm::decorations::parse_hex_color;
use crate::wm::events::{ButtonEvent, ClientRequest, KeyEvent, WmEvent};
use crate::wm::ewmh::Atoms;
use crate::wm::keyboard::{Keymap, Modifiers};
use crate::wm::session::{CursorGlyph, DisplaySession, Keysym, SessionError, SessionResult, StateChange, WindowId};

/// Events the manager needs on the root window
fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::FOCUS_CHANGE
}

/// Events the manager needs on each client
fn client_event_mask() -> EventMask {
    EventMask::ENTER_WINDOW | EventMask::FOCUS_CHANGE | EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY
}

/// Name published on the supporting WM check window
const WM_NAME: &str = "perch";

/// Cursor management
#[derive(Debug, Clone, Copy)]
pub struct Cursors {
    pub normal: Cursor,
    pub move_cursor: Cursor,
    pub resize: Cursor,
}

impl Cursors {
    // Glyph indices in the standard X cursor font
    const LEFT_PTR: u16 = 68;
    const FLEUR: u16 = 52;
    const SIZING: u16 = 120;

    pub fn new(conn: &RustConnection) -> SessionResult<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        let create_cursor = |glyph_id: u16| -> SessionResult<Cursor> {
            let cursor_id = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor_id,
                font,
                font,
                glyph_id,     // source_char
                glyph_id + 1, // mask_char (glyph + 1 for mask)
                0,
                0,
                0, // foreground: black
                0xffff,
                0xffff,
                0xffff, // background: white
            )?;
            Ok(cursor_id)
        };

        let cursors = Self {
            normal: create_cursor(Self::LEFT_PTR)?,
            move_cursor: create_cursor(Self::FLEUR)?,
            resize: create_cursor(Self::SIZING)?,
        };

        conn.close_font(font)?;
        Ok(cursors)
    }

    pub fn for_glyph(&self, glyph: CursorGlyph) -> Cursor {
        match glyph {
            CursorGlyph::Default => self.normal,
            CursorGlyph::Move => self.move_cursor,
            CursorGlyph::Resize => self.resize,
        }
    }
}

/// Keycode to keysym table fetched from the server
#[derive(Debug, Clone, Default)]
pub struct KeyboardMapping {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
}

impl KeyboardMapping {
    pub fn new(min_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    pub fn load(conn: &RustConnection) -> SessionResult<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;

        let reply = conn.get_keyboard_mapping(min_keycode, count)?.reply()?;
        debug!(
            "Keyboard mapping: {} keycodes, {} keysyms each",
            count, reply.keysyms_per_keycode
        );
        Ok(Self::new(min_keycode, reply.keysyms_per_keycode, reply.keysyms))
    }

    /// Keysym at group 0, level 0; `0` (NoSymbol) if the keycode is unmapped
    pub fn keysym(&self, keycode: u8) -> Keysym {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return 0;
        }
        let idx = usize::from(keycode - self.min_keycode) * usize::from(self.keysyms_per_keycode);
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    /// Every keycode whose unshifted keysym is `keysym`
    pub fn keycodes(&self, keysym: Keysym) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(usize::from(self.keysyms_per_keycode))
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&keysym))
            .filter_map(|(i, _)| u8::try_from(i).ok()?.checked_add(self.min_keycode))
            .collect()
    }
}

/// Decode a client message against the atoms we understand
pub fn decode_client_message(atoms: &Atoms, event: &ClientMessageEvent) -> ClientRequest {
    let data = event.data.as_data32();

    if event.type_ == atoms.net_active_window {
        ClientRequest::Activate
    } else if event.type_ == atoms.net_close_window {
        ClientRequest::Close
    } else if event.type_ == atoms.net_wm_state && data[1..3].contains(&atoms.net_wm_state_sticky) {
        match StateChange::from_ewmh(data[0]) {
            Some(change) => ClientRequest::Sticky(change),
            None => ClientRequest::Other(event.type_),
        }
    } else {
        ClientRequest::Other(event.type_)
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn button_event(detail: u8, state: KeyButMask, root_x: i16, root_y: i16, child: Window) -> ButtonEvent {
    ButtonEvent {
        button: detail,
        modifiers: Modifiers::from_state(u16::from(state)),
        root_x: root_x.into(),
        root_y: root_y.into(),
        subwindow: (child != x11rb::NONE).then_some(child),
    }
}

/// A live X11 connection acting as the window manager of one screen
pub struct X11Session {
    conn: Arc<RustConnection>,
    root: Window,
    screen_size: (u32, u32),
    colormap: Colormap,
    black_pixel: u32,
    atoms: Atoms,
    cursors: Cursors,
    keyboard: KeyboardMapping,
    check_window: Window,
    /// Installed key grabs, replayed when the keyboard mapping changes
    key_grabs: Vec<(Modifiers, Keysym)>,
}

impl X11Session {
    /// Connect to the display named by `$DISPLAY` and take over the root window
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = (u32::from(screen.width_in_pixels), u32::from(screen.height_in_pixels));
        let colormap = screen.default_colormap;
        let black_pixel = screen.black_pixel;
        info!(
            "Connected to screen {} ({}x{}), root {:#x}",
            screen_num, screen_size.0, screen_size.1, root
        );

        let cursors = Cursors::new(&conn)?;

        let change = ChangeWindowAttributesAux::new()
            .event_mask(root_event_mask())
            .cursor(cursors.normal);
        conn.change_window_attributes(root, &change)?
            .check()
            .context("Another window manager is already running")?;

        let atoms = Atoms::new(conn.as_ref())?;
        let keyboard = KeyboardMapping::load(&conn)?;

        let check_window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            check_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?;
        atoms.setup_wm_check(conn.as_ref(), root, check_window, WM_NAME)?;
        atoms.setup_supported(conn.as_ref(), root)?;
        conn.flush()?;

        Ok(Self {
            conn,
            root,
            screen_size,
            colormap,
            black_pixel,
            atoms,
            cursors,
            keyboard,
            check_window,
            key_grabs: Vec::new(),
        })
    }

    /// Shared handle for the event stream
    pub fn connection(&self) -> Arc<RustConnection> {
        self.conn.clone()
    }

    /// Grab every binding's key (with and without CapsLock) and the drag buttons
    pub fn grab_input(&mut self, keymap: &Keymap, drag_modifier: Modifiers) -> SessionResult<()> {
        self.key_grabs = keymap.bindings().iter().map(|b| (b.modifiers, b.keysym)).collect();
        self.grab_keys()?;

        self.conn.ungrab_button(ButtonIndex::ANY, self.root, ModMask::ANY)?;
        let pointer_mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        for button in [ButtonIndex::M1, ButtonIndex::M3] {
            for mods in [drag_modifier, drag_modifier | Modifiers::LOCK] {
                self.conn.grab_button(
                    false,
                    self.root,
                    pointer_mask,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    button,
                    ModMask::from(mods.bits()),
                )?;
            }
        }
        Ok(())
    }

    fn grab_keys(&self) -> SessionResult<()> {
        self.conn.ungrab_key(Grab::ANY, self.root, ModMask::ANY)?;

        let mut grabbed = 0;
        for &(modifiers, keysym) in &self.key_grabs {
            let keycodes = self.keyboard.keycodes(keysym);
            if keycodes.is_empty() {
                warn!("No keycode produces keysym {:#x}, binding unreachable", keysym);
            }
            for keycode in keycodes {
                for mods in [modifiers, modifiers | Modifiers::LOCK] {
                    self.conn.grab_key(
                        true,
                        self.root,
                        ModMask::from(mods.bits()),
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?;
                    grabbed += 1;
                }
            }
        }
        debug!("Installed {} key grabs", grabbed);
        Ok(())
    }

    /// Convert a protocol event; events the manager does not react to yield `None`
    pub fn translate_event(&mut self, event: Event) -> Option<WmEvent> {
        let translated = match event {
            Event::MapRequest(e) => WmEvent::MapRequest { window: e.window },
            Event::UnmapNotify(e) => WmEvent::UnmapNotify { window: e.window },
            Event::DestroyNotify(e) => WmEvent::DestroyNotify { window: e.window },
            Event::PropertyNotify(e) => WmEvent::PropertyNotify {
                window: e.window,
                atom: e.atom,
            },
            Event::MotionNotify(e) => WmEvent::MotionNotify {
                root_x: e.root_x.into(),
                root_y: e.root_y.into(),
            },
            Event::ClientMessage(e) => WmEvent::ClientMessage {
                window: e.window,
                request: decode_client_message(&self.atoms, &e),
            },
            Event::ButtonPress(e) => WmEvent::ButtonPress(button_event(e.detail, e.state, e.root_x, e.root_y, e.child)),
            Event::ButtonRelease(e) => {
                WmEvent::ButtonRelease(button_event(e.detail, e.state, e.root_x, e.root_y, e.child))
            }
            Event::KeyPress(e) => WmEvent::KeyPress(KeyEvent {
                keycode: e.detail,
                modifiers: Modifiers::from_state(u16::from(e.state)),
            }),
            Event::KeyRelease(e) => WmEvent::KeyRelease(KeyEvent {
                keycode: e.detail,
                modifiers: Modifiers::from_state(u16::from(e.state)),
            }),
            Event::FocusIn(e) => WmEvent::FocusIn { window: e.event },
            Event::FocusOut(e) => WmEvent::FocusOut { window: e.event },
            Event::EnterNotify(e) => WmEvent::EnterNotify { window: e.event },
            Event::MappingNotify(e) => {
                self.refresh_keyboard(e.request);
                return None;
            }
            Event::Error(e) => {
                debug!(
                    "X11 error {:?} (request {}, resource {:#x})",
                    e.error_kind, e.major_opcode, e.bad_value
                );
                return None;
            }
            other => {
                trace!("Ignoring event {:?}", other);
                return None;
            }
        };
        Some(translated)
    }

    fn refresh_keyboard(&mut self, request: Mapping) {
        if request != Mapping::KEYBOARD {
            return;
        }
        info!("Keyboard mapping changed, reloading");
        match KeyboardMapping::load(&self.conn) {
            Ok(keyboard) => self.keyboard = keyboard,
            Err(e) => {
                warn!("Failed to reload keyboard mapping: {}", e);
                return;
            }
        }
        if let Err(e) = self.grab_keys() {
            warn!("Failed to re-grab keys: {}", e);
        }
    }

    fn configure(&self, window: WindowId, aux: &ConfigureWindowAux) -> SessionResult<()> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn change_attributes(&self, window: WindowId, aux: &ChangeWindowAttributesAux) -> SessionResult<()> {
        self.conn.change_window_attributes(window, aux)?;
        Ok(())
    }
}

impl DisplaySession for X11Session {
    fn root(&self) -> WindowId {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }

    fn window_geometry(&mut self, window: WindowId) -> SessionResult<Geometry> {
        let reply = self
            .conn
            .get_geometry(window)?
            .reply()
            .map_err(|e| SessionError::from(e).for_window(window))?;
        Ok(
            Geometry::new(reply.x.into(), reply.y.into(), reply.width.into(), reply.height.into())
                .with_border(reply.border_width.into()),
        )
    }

    fn pointer_position(&mut self) -> SessionResult<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((reply.root_x.into(), reply.root_y.into()))
    }

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()> {
        self.configure(window, &ConfigureWindowAux::new().x(x).y(y))
    }

    fn resize_window(&mut self, window: WindowId, width: u32, height: u32) -> SessionResult<()> {
        self.configure(window, &ConfigureWindowAux::new().width(width).height(height))
    }

    fn move_resize_window(&mut self, window: WindowId, geometry: Geometry) -> SessionResult<()> {
        let aux = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.width)
            .height(geometry.height);
        self.configure(window, &aux)
    }

    fn raise_window(&mut self, window: WindowId) -> SessionResult<()> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
    }

    fn map_window(&mut self, window: WindowId) -> SessionResult<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u32) -> SessionResult<()> {
        self.configure(window, &ConfigureWindowAux::new().border_width(width))
    }

    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> SessionResult<()> {
        self.change_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))
    }

    fn set_input_focus(&mut self, window: WindowId) -> SessionResult<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn set_cursor(&mut self, window: WindowId, glyph: CursorGlyph) -> SessionResult<()> {
        let cursor = self.cursors.for_glyph(glyph);
        self.change_attributes(window, &ChangeWindowAttributesAux::new().cursor(cursor))
    }

    fn warp_pointer(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()> {
        self.conn
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, clamp_i16(x), clamp_i16(y))?;
        Ok(())
    }

    fn publish_active_window(&mut self, window: Option<WindowId>) -> SessionResult<()> {
        self.atoms.update_active_window(self.conn.as_ref(), self.root, window)
    }

    fn publish_desktops(&mut self, count: u32, current: u32) -> SessionResult<()> {
        self.atoms.update_desktops(self.conn.as_ref(), self.root, count, current)
    }

    fn window_exists(&mut self, window: WindowId) -> bool {
        self.conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some()
    }

    fn is_sticky(&mut self, window: WindowId) -> bool {
        match self.atoms.window_state(self.conn.as_ref(), window) {
            Ok(states) => states.contains(&self.atoms.net_wm_state_sticky),
            Err(e) => {
                trace!("Cannot read _NET_WM_STATE of {:#x}: {}", window, e);
                false
            }
        }
    }

    fn set_sticky(&mut self, window: WindowId, sticky: bool) -> SessionResult<()> {
        self.atoms
            .set_window_state(self.conn.as_ref(), window, self.atoms.net_wm_state_sticky, sticky)
    }

    fn select_client_events(&mut self, window: WindowId) -> SessionResult<()> {
        self.change_attributes(window, &ChangeWindowAttributesAux::new().event_mask(client_event_mask()))
    }

    fn existing_windows(&mut self) -> SessionResult<Vec<WindowId>> {
        let children = self.conn.query_tree(self.root)?.reply()?.children;

        let cookies = children
            .iter()
            .filter(|&&w| w != self.check_window)
            .map(|&w| -> SessionResult<_> { Ok((w, self.conn.get_window_attributes(w)?)) })
            .collect::<SessionResult<Vec<_>>>()?;

        Ok(cookies
            .into_iter()
            .filter_map(|(w, cookie)| {
                let attrs = cookie.reply().ok()?;
                (attrs.map_state == MapState::VIEWABLE && !attrs.override_redirect).then_some(w)
            })
            .collect())
    }

    fn close_window(&mut self, window: WindowId) -> SessionResult<()> {
        if self.atoms.supports_delete_protocol(self.conn.as_ref(), window)? {
            debug!("Sending WM_DELETE_WINDOW to {:#x}", window);
            self.atoms.send_delete_window(self.conn.as_ref(), window)
        } else {
            debug!("{:#x} does not support WM_DELETE_WINDOW, killing client", window);
            self.conn.kill_client(window)?;
            Ok(())
        }
    }

    fn keycode_to_keysym(&self, keycode: u8) -> Keysym {
        self.keyboard.keysym(keycode)
    }

    fn alloc_color(&mut self, name: &str) -> SessionResult<u32> {
        let reply = match parse_hex_color(name) {
            Some((r, g, b)) => self.conn.alloc_color(self.colormap, r, g, b)?.reply().map(|r| r.pixel),
            None => self
                .conn
                .alloc_named_color(self.colormap, name.as_bytes())?
                .reply()
                .map(|r| r.pixel),
        };
        reply.map_err(|e| match e {
            ReplyError::X11Error(_) => SessionError::UnknownColor(name.to_string()),
            other => other.into(),
        })
    }

    fn black_pixel(&self) -> u32 {
        self.black_pixel
    }

    fn flush(&mut self) -> SessionResult<()> {
        self.conn.flush()?;
        Ok(())
    }
}
