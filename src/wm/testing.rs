//! In-memory display session for driving the window manager in tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::decorations::parse_hex_color;
use crate::wm::session::{CursorGlyph, DisplaySession, Keysym, SessionError, SessionResult, WindowId};

pub const FAKE_ROOT: WindowId = 0x1;

/// A request the window manager issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(WindowId, i32, i32),
    Resize(WindowId, u32, u32),
    MoveResize(WindowId, Geometry),
    Raise(WindowId),
    Map(WindowId),
    SetBorderWidth(WindowId, u32),
    SetBorderColor(WindowId, u32),
    SetInputFocus(WindowId),
    SetCursor(WindowId, CursorGlyph),
    WarpPointer(WindowId, i32, i32),
    PublishActive(Option<WindowId>),
    PublishDesktops(u32, u32),
    SetSticky(WindowId, bool),
    SelectEvents(WindowId),
    Close(WindowId),
}

#[derive(Debug, Default)]
pub struct FakeSession {
    screen: (u32, u32),
    windows: BTreeMap<WindowId, Geometry>,
    mapped: BTreeSet<WindowId>,
    border_colors: HashMap<WindowId, u32>,
    sticky: HashSet<WindowId>,
    pointer: (i32, i32),
    published_active: Option<WindowId>,
    published_desktops: Option<(u32, u32)>,
    keysyms: HashMap<u8, Keysym>,
    broken_geometry: HashSet<WindowId>,
    broken_pointer: bool,
    commands: Vec<Command>,
}

impl FakeSession {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: (width, height),
            ..Self::default()
        }
    }

    pub fn add_window(&mut self, window: WindowId, geometry: Geometry) {
        self.windows.insert(window, geometry);
    }

    /// A window that was already on screen before the manager started
    pub fn add_mapped_window(&mut self, window: WindowId, geometry: Geometry) {
        self.windows.insert(window, geometry);
        self.mapped.insert(window);
    }

    pub fn remove_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
        self.mapped.remove(&window);
    }

    pub fn bind_keycode(&mut self, keycode: u8, keysym: Keysym) {
        self.keysyms.insert(keycode, keysym);
    }

    pub fn set_pointer(&mut self, x: i32, y: i32) {
        self.pointer = (x, y);
    }

    pub fn fail_geometry(&mut self, window: WindowId) {
        self.broken_geometry.insert(window);
    }

    pub fn fail_pointer(&mut self) {
        self.broken_pointer = true;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn geometry(&self, window: WindowId) -> Option<Geometry> {
        self.windows.get(&window).copied()
    }

    pub fn border_color(&self, window: WindowId) -> Option<u32> {
        self.border_colors.get(&window).copied()
    }

    pub fn border_width(&self, window: WindowId) -> Option<u32> {
        self.windows.get(&window).map(|g| g.border_width)
    }

    pub fn is_mapped(&self, window: WindowId) -> bool {
        self.mapped.contains(&window)
    }

    pub fn is_sticky_now(&self, window: WindowId) -> bool {
        self.sticky.contains(&window)
    }

    pub fn published_active(&self) -> Option<WindowId> {
        self.published_active
    }

    pub fn published_desktops(&self) -> Option<(u32, u32)> {
        self.published_desktops
    }

    pub fn pointer(&self) -> (i32, i32) {
        self.pointer
    }
}

impl DisplaySession for FakeSession {
    fn root(&self) -> WindowId {
        FAKE_ROOT
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn window_geometry(&mut self, window: WindowId) -> SessionResult<Geometry> {
        if self.broken_geometry.contains(&window) {
            return Err(SessionError::BadWindow(window));
        }
        self.windows.get(&window).copied().ok_or(SessionError::BadWindow(window))
    }

    fn pointer_position(&mut self) -> SessionResult<(i32, i32)> {
        if self.broken_pointer {
            return Err(SessionError::BadWindow(FAKE_ROOT));
        }
        Ok(self.pointer)
    }

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()> {
        self.commands.push(Command::Move(window, x, y));
        if let Some(g) = self.windows.get_mut(&window) {
            *g = g.moved_to(x, y);
        }
        Ok(())
    }

    fn resize_window(&mut self, window: WindowId, width: u32, height: u32) -> SessionResult<()> {
        self.commands.push(Command::Resize(window, width, height));
        if let Some(g) = self.windows.get_mut(&window) {
            *g = g.resized_to(width, height);
        }
        Ok(())
    }

    fn move_resize_window(&mut self, window: WindowId, geometry: Geometry) -> SessionResult<()> {
        self.commands.push(Command::MoveResize(window, geometry));
        if let Some(g) = self.windows.get_mut(&window) {
            *g = g.moved_to(geometry.x, geometry.y).resized_to(geometry.width, geometry.height);
        }
        Ok(())
    }

    fn raise_window(&mut self, window: WindowId) -> SessionResult<()> {
        self.commands.push(Command::Raise(window));
        Ok(())
    }

    fn map_window(&mut self, window: WindowId) -> SessionResult<()> {
        self.commands.push(Command::Map(window));
        self.mapped.insert(window);
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u32) -> SessionResult<()> {
        self.commands.push(Command::SetBorderWidth(window, width));
        if let Some(g) = self.windows.get_mut(&window) {
            g.border_width = width;
        }
        Ok(())
    }

    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> SessionResult<()> {
        self.commands.push(Command::SetBorderColor(window, pixel));
        self.border_colors.insert(window, pixel);
        Ok(())
    }

    fn set_input_focus(&mut self, window: WindowId) -> SessionResult<()> {
        self.commands.push(Command::SetInputFocus(window));
        Ok(())
    }

    fn set_cursor(&mut self, window: WindowId, glyph: CursorGlyph) -> SessionResult<()> {
        self.commands.push(Command::SetCursor(window, glyph));
        Ok(())
    }

    fn warp_pointer(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()> {
        self.commands.push(Command::WarpPointer(window, x, y));
        if let Some(g) = self.windows.get(&window) {
            let bw = g.border_width as i32;
            self.pointer = (g.x + bw + x, g.y + bw + y);
        }
        Ok(())
    }

    fn publish_active_window(&mut self, window: Option<WindowId>) -> SessionResult<()> {
        self.commands.push(Command::PublishActive(window));
        self.published_active = window;
        Ok(())
    }

    fn publish_desktops(&mut self, count: u32, current: u32) -> SessionResult<()> {
        self.commands.push(Command::PublishDesktops(count, current));
        self.published_desktops = Some((count, current));
        Ok(())
    }

    fn window_exists(&mut self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    fn is_sticky(&mut self, window: WindowId) -> bool {
        self.sticky.contains(&window)
    }

    fn set_sticky(&mut self, window: WindowId, sticky: bool) -> SessionResult<()> {
        self.commands.push(Command::SetSticky(window, sticky));
        if sticky {
            self.sticky.insert(window);
        } else {
            self.sticky.remove(&window);
        }
        Ok(())
    }

    fn select_client_events(&mut self, window: WindowId) -> SessionResult<()> {
        self.commands.push(Command::SelectEvents(window));
        Ok(())
    }

    fn existing_windows(&mut self) -> SessionResult<Vec<WindowId>> {
        Ok(self.mapped.iter().copied().collect())
    }

    fn close_window(&mut self, window: WindowId) -> SessionResult<()> {
        self.commands.push(Command::Close(window));
        Ok(())
    }

    fn keycode_to_keysym(&self, keycode: u8) -> Keysym {
        self.keysyms.get(&keycode).copied().unwrap_or(0)
    }

    fn alloc_color(&mut self, name: &str) -> SessionResult<u32> {
        let (r, g, b) = parse_hex_color(name).ok_or_else(|| SessionError::UnknownColor(name.to_string()))?;
        Ok((u32::from(r >> 8) << 16) | (u32::from(g >> 8) << 8) | u32::from(b >> 8))
    }

    fn black_pixel(&self) -> u32 {
        0
    }

    fn flush(&mut self) -> SessionResult<()> {
        Ok(())
    }
}

/// Window manager over a fake session with the default configuration
pub fn test_manager(session: FakeSession) -> WindowManager<FakeSession> {
    WindowManager::new(session, &Config::default())
}
