//! Keybinding actions
//!
//! Discrete commands bound to keys. The directional ones operate on the
//! active window and keep the pointer at the same offset from the window's
//! origin, so it travels with the window.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::moveresize::grow;
use crate::wm::session::{DisplaySession, WindowId};

/// Screen edge for snap commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// What a key binding does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "arg", rename_all = "snake_case")]
pub enum Action {
    /// Move the active window horizontally by this many pixels
    MoveX(i32),
    /// Move the active window vertically by this many pixels
    MoveY(i32),
    /// Grow (or shrink, if negative) the active window's width
    ResizeX(i32),
    /// Grow (or shrink, if negative) the active window's height
    ResizeY(i32),
    /// Put the active window flush against a screen edge
    Snap(Direction),
    Center,
    Close,
    ToggleSticky,
    /// Run a shell command
    Spawn(String),
    Quit,
}

/// Smallest width or height a keyboard resize produces
pub const MIN_KEYBOARD_SIZE: u32 = 1;

/// New geometry for a snap towards `direction`
pub fn snap_geometry(geometry: Geometry, direction: Direction, screen: (u32, u32)) -> Geometry {
    let (sw, sh) = screen;
    match direction {
        Direction::Up => geometry.moved_to(geometry.x, 0),
        Direction::Left => geometry.moved_to(0, geometry.y),
        Direction::Down => geometry.moved_to(geometry.x, sh as i32 - geometry.outer_height() as i32),
        Direction::Right => geometry.moved_to(sw as i32 - geometry.outer_width() as i32, geometry.y),
    }
}

/// New geometry centering the window on the screen
pub fn center_geometry(geometry: Geometry, screen: (u32, u32)) -> Geometry {
    let x = (screen.0 as i32 - geometry.outer_width() as i32) / 2;
    let y = (screen.1 as i32 - geometry.outer_height() as i32) / 2;
    geometry.moved_to(x, y)
}

impl<S: DisplaySession> WindowManager<S> {
    pub fn run_action(&mut self, action: &Action) -> Result<()> {
        debug!("Running action {:?}", action);
        match action {
            Action::MoveX(dx) => self.reshape_active(|g, _| g.moved_to(g.x + dx, g.y)),
            Action::MoveY(dy) => self.reshape_active(|g, _| g.moved_to(g.x, g.y + dy)),
            Action::ResizeX(dw) => {
                self.reshape_active(|g, _| g.resized_to(grow(g.width, *dw, MIN_KEYBOARD_SIZE), g.height))
            }
            Action::ResizeY(dh) => {
                self.reshape_active(|g, _| g.resized_to(g.width, grow(g.height, *dh, MIN_KEYBOARD_SIZE)))
            }
            Action::Snap(direction) => self.reshape_active(|g, screen| snap_geometry(g, *direction, screen)),
            Action::Center => self.reshape_active(center_geometry),
            Action::Close => self.close_active(),
            Action::ToggleSticky => self.toggle_sticky_active(),
            Action::Spawn(command) => {
                let pid = self.children.spawn_shell(command)?;
                debug!("Spawned pid {}, {} children tracked", pid, self.children.len());
                Ok(())
            }
            Action::Quit => {
                info!("Quit requested");
                self.running = false;
                Ok(())
            }
        }
    }

    /// Apply `reshape` to the active window's geometry and carry the pointer along
    fn reshape_active<F>(&mut self, reshape: F) -> Result<()>
    where
        F: FnOnce(Geometry, (u32, u32)) -> Geometry,
    {
        let Some(window) = self.focus.get() else {
            debug!("No active window, nothing to reshape");
            return Ok(());
        };

        let current = self.session.window_geometry(window)?;
        let pointer = self.session.pointer_position().ok();
        let target = reshape(current, self.session.screen_size());

        self.apply_geometry(window, current, target)?;

        if let Some((px, py)) = pointer {
            // Offset from the window's origin, which sits inside the border
            let offset_x = px - current.x - current.border_width as i32;
            let offset_y = py - current.y - current.border_width as i32;
            self.session.warp_pointer(window, offset_x, offset_y)?;
        }
        Ok(())
    }

    fn apply_geometry(&mut self, window: WindowId, current: Geometry, target: Geometry) -> Result<()> {
        let moved = (current.x, current.y) != (target.x, target.y);
        let resized = (current.width, current.height) != (target.width, target.height);
        match (moved, resized) {
            (true, false) => self.session.move_window(window, target.x, target.y)?,
            (false, true) => self.session.resize_window(window, target.width, target.height)?,
            (true, true) => self.session.move_resize_window(window, target)?,
            (false, false) => {}
        }
        Ok(())
    }

    fn close_active(&mut self) -> Result<()> {
        if let Some(window) = self.focus.get() {
            info!("Closing window {:#x}", window);
            self.session.close_window(window)?;
        }
        Ok(())
    }

    fn toggle_sticky_active(&mut self) -> Result<()> {
        if let Some(window) = self.focus.get() {
            let sticky = !self.session.is_sticky(window);
            self.set_sticky(window, sticky)?;
        }
        Ok(())
    }

    /// Update the sticky state and repaint the border to match
    pub(crate) fn set_sticky(&mut self, window: WindowId, sticky: bool) -> Result<()> {
        debug!("Window {:#x} sticky={}", window, sticky);
        self.session.set_sticky(window, sticky)?;
        let active = self.focus.is(window);
        self.paint_border(window, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::events::WmEvent;
    use crate::wm::testing::{Command as Cmd, FakeSession, test_manager};

    const WIN: WindowId = 0x700001;

    fn manager_with_active(geometry: Geometry) -> WindowManager<FakeSession> {
        let mut session = FakeSession::new(1920, 1080);
        session.add_window(WIN, geometry);
        let mut wm = test_manager(session);
        wm.activate(Some(WIN)).unwrap();
        wm.session_mut().clear_commands();
        wm
    }

    #[test]
    fn test_snap_right_subtracts_both_borders() {
        let mut wm = manager_with_active(Geometry::new(300, 250, 500, 400).with_border(2));
        wm.run_action(&Action::Snap(Direction::Right)).unwrap();
        let geom = wm.session().geometry(WIN).unwrap();
        assert_eq!((geom.x, geom.y), (1416, 250));
    }

    #[test]
    fn test_snap_each_edge() {
        let start = Geometry::new(300, 250, 500, 400).with_border(2);
        assert_eq!(snap_geometry(start, Direction::Up, (1920, 1080)), start.moved_to(300, 0));
        assert_eq!(snap_geometry(start, Direction::Left, (1920, 1080)), start.moved_to(0, 250));
        assert_eq!(snap_geometry(start, Direction::Down, (1920, 1080)), start.moved_to(300, 676));
    }

    #[test]
    fn test_resize_x_floors_at_one_pixel() {
        let mut wm = manager_with_active(Geometry::new(10, 10, 50, 80));
        wm.run_action(&Action::ResizeX(-1000)).unwrap();
        let geom = wm.session().geometry(WIN).unwrap();
        assert_eq!((geom.width, geom.height), (1, 80));
    }

    #[test]
    fn test_move_keeps_pointer_offset() {
        let mut wm = manager_with_active(Geometry::new(100, 100, 400, 300).with_border(2));
        wm.session_mut().set_pointer(150, 130);
        wm.run_action(&Action::MoveX(40)).unwrap();

        // Offset is taken from the inner origin at (102, 102)
        assert!(wm.session().commands().contains(&Cmd::Move(WIN, 140, 100)));
        assert!(wm.session().commands().contains(&Cmd::WarpPointer(WIN, 48, 28)));
        assert_eq!(wm.session().pointer(), (190, 130));
    }

    #[test]
    fn test_pointer_offset_accounts_for_border() {
        let mut wm = manager_with_active(Geometry::new(100, 100, 400, 300).with_border(2));
        wm.session_mut().set_pointer(150, 130);
        wm.run_action(&Action::MoveY(-50)).unwrap();
        assert_eq!(wm.session().pointer(), (150, 80));
    }

    #[test]
    fn test_resize_uses_resize_command() {
        let mut wm = manager_with_active(Geometry::new(100, 100, 400, 300));
        wm.run_action(&Action::ResizeY(20)).unwrap();
        assert!(wm.session().commands().contains(&Cmd::Resize(WIN, 400, 320)));
    }

    #[test]
    fn test_center_counts_active_border() {
        let mut wm = manager_with_active(Geometry::new(0, 0, 400, 300).with_border(2));
        wm.run_action(&Action::Center).unwrap();
        let geom = wm.session().geometry(WIN).unwrap();
        assert_eq!((geom.x, geom.y), (758, 388));
        assert_eq!(geom.x + geom.outer_width() as i32, 1920 - 758);
    }

    #[test]
    fn test_actions_without_active_window_are_noops() {
        let mut session = FakeSession::new(1920, 1080);
        session.add_window(WIN, Geometry::new(0, 0, 400, 300));
        let mut wm = test_manager(session);
        for action in [
            Action::MoveX(10),
            Action::ResizeY(-10),
            Action::Snap(Direction::Down),
            Action::Center,
            Action::Close,
            Action::ToggleSticky,
        ] {
            wm.run_action(&action).unwrap();
        }
        assert!(wm.session().commands().is_empty());
    }

    #[test]
    fn test_toggle_sticky_repaints_border() {
        let mut wm = manager_with_active(Geometry::new(0, 0, 400, 300));
        let palette = wm.palette;
        wm.run_action(&Action::ToggleSticky).unwrap();
        assert!(wm.session().is_sticky_now(WIN));
        assert_eq!(wm.session().border_color(WIN), Some(palette.sticky_active));

        wm.run_action(&Action::ToggleSticky).unwrap();
        assert!(!wm.session().is_sticky_now(WIN));
        assert_eq!(wm.session().border_color(WIN), Some(palette.normal_active));
    }

    #[test]
    fn test_close_targets_active_window() {
        let mut wm = manager_with_active(Geometry::new(0, 0, 400, 300));
        wm.run_action(&Action::Close).unwrap();
        assert_eq!(wm.session().commands(), &[Cmd::Close(WIN)]);
    }

    #[test]
    fn test_spawned_child_reaped_on_later_event() {
        let mut wm = manager_with_active(Geometry::new(0, 0, 400, 300));
        wm.run_action(&Action::Spawn("true".into())).unwrap();
        assert_eq!(wm.children.len(), 1);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !wm.children.is_empty() && std::time::Instant::now() < deadline {
            wm.handle_event(WmEvent::PropertyNotify { window: WIN, atom: 0 }).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(wm.children.is_empty());
    }

    #[test]
    fn test_quit_stops_manager() {
        let mut wm = manager_with_active(Geometry::new(0, 0, 400, 300));
        assert!(wm.is_running());
        wm.run_action(&Action::Quit).unwrap();
        assert!(!wm.is_running());
    }

    #[test]
    fn test_action_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            action: Action,
        }
        let parsed: Wrapper = toml::from_str(r#"action = { kind = "resize_x", arg = -20 }"#).unwrap();
        assert_eq!(parsed.action, Action::ResizeX(-20));
        let parsed: Wrapper = toml::from_str(r#"action = { kind = "snap", arg = "left" }"#).unwrap();
        assert_eq!(parsed.action, Action::Snap(Direction::Left));
        let parsed: Wrapper = toml::from_str(r#"action = { kind = "quit" }"#).unwrap();
        assert_eq!(parsed.action, Action::Quit);
    }
}
