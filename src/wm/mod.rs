//! Window Manager Module
//!
//! The event-driven core: a [`WindowManager`] owns the display session, the
//! active window, the drag in progress and the keybinding table, and turns
//! each [`WmEvent`] into requests back to the session.

pub mod actions;
pub mod children;
pub mod decorations;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod keyboard;
pub mod moveresize;
pub mod placement;
pub mod session;

#[cfg(test)]
pub mod testing;

use anyhow::Result;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::wm::children::Children;
use crate::wm::decorations::BorderPalette;
use crate::wm::events::{ClientRequest, KeyEvent, WmEvent};
use crate::wm::focus::ActiveWindow;
use crate::wm::keyboard::{Keymap, Modifiers};
use crate::wm::moveresize::MoveResizeManager;
use crate::wm::session::{DisplaySession, WindowId};

pub struct WindowManager<S: DisplaySession> {
    session: S,
    palette: BorderPalette,
    focus: ActiveWindow,
    drag: MoveResizeManager,
    children: Children,
    keymap: Keymap,
    /// Modifiers that must be held for a button press to start a drag
    drag_modifier: Modifiers,
    border_width: u32,
    desktops: u32,
    running: bool,
}

impl<S: DisplaySession> WindowManager<S> {
    /// Create a new window manager over `session`. Border colors are resolved here,
    /// once.
    pub fn new(mut session: S, config: &Config) -> Self {
        let palette = BorderPalette::resolve(&mut session, &config.appearance.colors);
        let drag_modifier = Modifiers::from_names(&config.behavior.drag_modifier).unwrap_or_else(|| {
            warn!(
                "Unknown drag modifier {:?}, falling back to Mod4",
                config.behavior.drag_modifier
            );
            Modifiers::MOD4
        });

        Self {
            session,
            palette,
            focus: ActiveWindow::new(),
            drag: MoveResizeManager::new(),
            children: Children::new(),
            keymap: Keymap::from_config(&config.keybindings),
            drag_modifier: drag_modifier.canonical(),
            border_width: config.appearance.border_width,
            desktops: config.behavior.desktops.max(1),
            running: true,
        }
    }

    /// Publish the desktop properties and take over windows that were already
    /// mapped before we started.
    pub fn startup(&mut self) -> Result<()> {
        self.session.publish_desktops(self.desktops, 0)?;
        self.set_active_window(None)?;

        let existing = self.session.existing_windows()?;
        info!("Adopting {} existing windows", existing.len());
        for window in existing {
            self.session.select_client_events(window)?;
            self.paint_border(window, false)?;
        }
        self.session.flush()?;
        Ok(())
    }

    /// Withdraw the active window advertisement before exiting
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down");
        if let Some(window) = self.active_window() {
            debug!("Releasing active window {:#x}", window);
        }
        self.set_active_window(None)?;
        self.session.flush()?;
        Ok(())
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn drag_modifier(&self) -> Modifiers {
        self.drag_modifier
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.focus.get()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Route one event to its handler
    pub fn handle_event(&mut self, event: WmEvent) -> Result<()> {
        self.children.reap();
        match event {
            WmEvent::MotionNotify { root_x, root_y } => self.on_motion(root_x, root_y),
            WmEvent::MapRequest { window } => self.on_map_request(window),
            WmEvent::UnmapNotify { window } => {
                debug!("UnmapNotify: window {:#x}", window);
                self.on_window_gone(window)
            }
            WmEvent::DestroyNotify { window } => {
                debug!("DestroyNotify: window {:#x}", window);
                self.on_window_gone(window)
            }
            WmEvent::PropertyNotify { window, atom } => {
                trace!("PropertyNotify: window {:#x}, atom {}", window, atom);
                Ok(())
            }
            WmEvent::ClientMessage { window, request } => self.on_client_message(window, request),
            WmEvent::ButtonPress(e) => self.on_button_press(e),
            WmEvent::ButtonRelease(e) => self.on_button_release(e),
            WmEvent::KeyPress(e) => self.on_key_press(e),
            WmEvent::KeyRelease(e) => {
                trace!("KeyRelease: keycode {}", e.keycode);
                Ok(())
            }
            WmEvent::FocusIn { window } => {
                if window != self.session.root() {
                    debug!("FocusIn: window {:#x}", window);
                }
                Ok(())
            }
            WmEvent::FocusOut { window } => {
                if window != self.session.root() {
                    debug!("FocusOut: window {:#x}", window);
                }
                Ok(())
            }
            WmEvent::EnterNotify { window } => {
                if window == self.session.root() {
                    return Ok(());
                }
                self.activate(Some(window))
            }
        }
    }

    fn on_map_request(&mut self, window: WindowId) -> Result<()> {
        debug!("MapRequest: window {:#x}", window);

        match self.session.window_geometry(window) {
            Ok(geometry) => match self.session.pointer_position() {
                Ok(pointer) => {
                    // activate() below applies the configured border, so place
                    // with that width rather than the client's own
                    let geometry = geometry.with_border(self.border_width);
                    let (x, y) = placement::place_under_pointer(pointer, &geometry, self.session.screen_size());
                    self.session.move_window(window, x, y)?;
                }
                Err(e) => warn!("Pointer query failed, leaving {:#x} where it is: {}", window, e),
            },
            Err(e) => warn!("Geometry of {:#x} unavailable, skipping placement: {}", window, e),
        }

        self.session.select_client_events(window)?;
        self.activate(Some(window))?;
        self.session.map_window(window)?;
        self.session.raise_window(window)?;
        self.session.set_input_focus(window)?;
        Ok(())
    }

    fn on_window_gone(&mut self, window: WindowId) -> Result<()> {
        if self.drag.cancel_for(window) {
            debug!("Drag target {:#x} went away, drag abandoned", window);
        }
        self.forget_window(window)
    }

    fn on_client_message(&mut self, window: WindowId, request: ClientRequest) -> Result<()> {
        debug!("ClientMessage: window {:#x}, {:?}", window, request);
        match request {
            ClientRequest::Activate => {
                self.activate(Some(window))?;
                self.session.raise_window(window)?;
                self.session.set_input_focus(window)?;
            }
            ClientRequest::Close => self.session.close_window(window)?,
            ClientRequest::Sticky(change) => {
                let sticky = change.apply(self.session.is_sticky(window));
                self.set_sticky(window, sticky)?;
            }
            ClientRequest::Other(atom) => trace!("Ignoring client message type {}", atom),
        }
        Ok(())
    }

    fn on_key_press(&mut self, event: KeyEvent) -> Result<()> {
        let keysym = self.session.keycode_to_keysym(event.keycode);
        debug!(
            "KeyPress: keycode {} -> keysym {:#x}, modifiers {:?}",
            event.keycode, keysym, event.modifiers
        );

        let Some(action) = self.keymap.lookup(keysym, event.modifiers).map(|b| b.action.clone()) else {
            return Ok(());
        };
        self.run_action(&action)
    }
}
