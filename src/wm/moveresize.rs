//! MoveResize Module
//!
//! Pointer-driven moving and resizing. A modifier-qualified press over a
//! window starts a drag; every motion event recomputes the window geometry
//! from the press-time snapshot; the release ends it.

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::events::ButtonEvent;
use crate::wm::session::{CursorGlyph, DisplaySession, WindowId};

/// Smallest width or height a drag resize produces
pub const MIN_DRAG_SIZE: u32 = 100;

/// Move/resize operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResizeOperation {
    Move,
    Resize,
}

impl MoveResizeOperation {
    /// Button 1 moves, button 3 resizes; other buttons do not drag
    pub fn from_button(button: u8) -> Option<Self> {
        match button {
            1 => Some(Self::Move),
            3 => Some(Self::Resize),
            _ => None,
        }
    }

    pub fn cursor(self) -> CursorGlyph {
        match self {
            Self::Move => CursorGlyph::Move,
            Self::Resize => CursorGlyph::Resize,
        }
    }
}

/// Move/resize operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResizeState {
    pub window: WindowId,
    /// The press that started the drag
    pub origin: ButtonEvent,
    /// Window geometry at press time
    pub start_geometry: Geometry,
    pub operation: MoveResizeOperation,
}

impl MoveResizeState {
    /// Geometry for the pointer at `(root_x, root_y)`
    pub fn target_geometry(&self, root_x: i32, root_y: i32) -> Geometry {
        let dx = root_x - self.origin.root_x;
        let dy = root_y - self.origin.root_y;
        let start = self.start_geometry;

        match self.operation {
            MoveResizeOperation::Move => start.moved_to(start.x + dx, start.y + dy),
            MoveResizeOperation::Resize => start.resized_to(
                grow(start.width, dx, MIN_DRAG_SIZE),
                grow(start.height, dy, MIN_DRAG_SIZE),
            ),
        }
    }
}

/// `size + delta`, never below `floor`
pub(crate) fn grow(size: u32, delta: i32, floor: u32) -> u32 {
    let grown = i64::from(size) + i64::from(delta);
    grown.max(i64::from(floor)) as u32
}

/// Tracks at most one in-progress drag
#[derive(Debug, Default)]
pub struct MoveResizeManager {
    state: Option<MoveResizeState>,
}

impl MoveResizeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, state: MoveResizeState) {
        self.state = Some(state);
    }

    pub fn current(&self) -> Option<&MoveResizeState> {
        self.state.as_ref()
    }

    pub fn take(&mut self) -> Option<MoveResizeState> {
        self.state.take()
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// Abandon the drag if it targets `window`
    pub fn cancel_for(&mut self, window: WindowId) -> bool {
        if self.state.is_some_and(|s| s.window == window) {
            self.state = None;
            return true;
        }
        false
    }
}

impl<S: DisplaySession> WindowManager<S> {
    pub(crate) fn on_button_press(&mut self, event: ButtonEvent) -> Result<()> {
        let Some(window) = event.subwindow else {
            return Ok(());
        };
        if !event.modifiers.contains(self.drag_modifier) {
            debug!("ButtonPress {} on {:#x} without drag modifier, ignoring", event.button, window);
            return Ok(());
        }

        self.session.raise_window(window)?;

        let snapshot = match self.session.window_geometry(window) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                warn!("Cannot snapshot geometry of {:#x}, not dragging: {}", window, e);
                None
            }
        };

        self.activate(Some(window))?;

        let (Some(operation), Some(start_geometry)) = (MoveResizeOperation::from_button(event.button), snapshot)
        else {
            return Ok(());
        };

        debug!("Starting {:?} of {:#x} from {:?}", operation, window, start_geometry);
        self.drag.begin(MoveResizeState {
            window,
            origin: event,
            start_geometry,
            operation,
        });
        self.session.set_cursor(window, operation.cursor())?;
        Ok(())
    }

    pub(crate) fn on_motion(&mut self, root_x: i32, root_y: i32) -> Result<()> {
        let Some(state) = self.drag.current().copied() else {
            return Ok(());
        };
        let target = state.target_geometry(root_x, root_y);
        trace!("Drag {:?} of {:#x} -> {:?}", state.operation, state.window, target);
        self.session.move_resize_window(state.window, target)?;
        Ok(())
    }

    pub(crate) fn on_button_release(&mut self, event: ButtonEvent) -> Result<()> {
        let Some(state) = self.drag.take() else {
            return Ok(());
        };
        debug!(
            "Finished {:?} of {:#x} (button {} released)",
            state.operation, state.window, event.button
        );
        self.session.set_cursor(state.window, CursorGlyph::Default)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::events::WmEvent;
    use crate::wm::keyboard::Modifiers;
    use crate::wm::testing::{Command, FakeSession, test_manager};

    const WIN: WindowId = 0x500001;

    fn press(button: u8, modifiers: Modifiers, x: i32, y: i32) -> WmEvent {
        WmEvent::ButtonPress(ButtonEvent {
            button,
            modifiers,
            root_x: x,
            root_y: y,
            subwindow: Some(WIN),
        })
    }

    fn release(button: u8) -> WmEvent {
        WmEvent::ButtonRelease(ButtonEvent {
            button,
            modifiers: Modifiers::MOD4,
            root_x: 0,
            root_y: 0,
            subwindow: Some(WIN),
        })
    }

    fn manager() -> WindowManager<FakeSession> {
        let mut session = FakeSession::new(1920, 1080);
        session.add_window(WIN, Geometry::new(100, 100, 400, 300));
        test_manager(session)
    }

    #[test]
    fn test_move_drag_has_no_drift() {
        let mut wm = manager();
        wm.handle_event(press(1, Modifiers::MOD4, 200, 200)).unwrap();
        wm.handle_event(WmEvent::MotionNotify { root_x: 250, root_y: 180 }).unwrap();
        wm.handle_event(WmEvent::MotionNotify { root_x: 230, root_y: 260 }).unwrap();
        wm.handle_event(release(1)).unwrap();

        let geom = wm.session().geometry(WIN).unwrap();
        assert_eq!((geom.x, geom.y), (130, 160));
        assert_eq!((geom.width, geom.height), (400, 300));
        assert!(!wm.drag.is_dragging());
    }

    #[test]
    fn test_resize_drag_floors_at_minimum() {
        let mut wm = manager();
        wm.handle_event(press(3, Modifiers::MOD4, 500, 400)).unwrap();
        wm.handle_event(WmEvent::MotionNotify { root_x: 0, root_y: 390 }).unwrap();

        let geom = wm.session().geometry(WIN).unwrap();
        assert_eq!((geom.width, geom.height), (MIN_DRAG_SIZE, 290));
        assert_eq!((geom.x, geom.y), (100, 100));
    }

    #[test]
    fn test_press_activates_raises_and_sets_cursor() {
        let mut wm = manager();
        wm.handle_event(press(1, Modifiers::MOD4, 200, 200)).unwrap();

        let commands = wm.session().commands();
        assert!(commands.contains(&Command::Raise(WIN)));
        assert!(commands.contains(&Command::SetCursor(WIN, CursorGlyph::Move)));
        assert_eq!(wm.active_window(), Some(WIN));

        wm.handle_event(release(1)).unwrap();
        assert_eq!(
            wm.session().commands().last(),
            Some(&Command::SetCursor(WIN, CursorGlyph::Default))
        );
    }

    #[test]
    fn test_press_without_modifier_does_nothing() {
        let mut wm = manager();
        wm.handle_event(press(1, Modifiers::empty(), 200, 200)).unwrap();
        assert!(wm.session().commands().is_empty());
        assert_eq!(wm.active_window(), None);
        assert!(!wm.drag.is_dragging());
    }

    #[test]
    fn test_other_button_activates_without_drag() {
        let mut wm = manager();
        wm.handle_event(press(2, Modifiers::MOD4, 200, 200)).unwrap();
        assert_eq!(wm.active_window(), Some(WIN));
        assert!(!wm.drag.is_dragging());

        wm.handle_event(WmEvent::MotionNotify { root_x: 900, root_y: 900 }).unwrap();
        assert_eq!(wm.session().geometry(WIN).unwrap().x, 100);
    }

    #[test]
    fn test_failed_snapshot_still_activates() {
        let mut wm = manager();
        wm.session_mut().fail_geometry(WIN);
        wm.handle_event(press(1, Modifiers::MOD4, 200, 200)).unwrap();
        assert_eq!(wm.active_window(), Some(WIN));
        assert!(!wm.drag.is_dragging());
    }

    #[test]
    fn test_press_on_root_is_ignored() {
        let mut wm = manager();
        let event = WmEvent::ButtonPress(ButtonEvent {
            button: 1,
            modifiers: Modifiers::MOD4,
            root_x: 5,
            root_y: 5,
            subwindow: None,
        });
        wm.handle_event(event).unwrap();
        assert!(wm.session().commands().is_empty());
    }

    #[test]
    fn test_motion_without_drag_is_ignored() {
        let mut wm = manager();
        wm.handle_event(WmEvent::MotionNotify { root_x: 10, root_y: 10 }).unwrap();
        assert!(wm.session().commands().is_empty());
    }

    #[test]
    fn test_destroying_drag_target_cancels_drag() {
        let mut wm = manager();
        wm.handle_event(press(1, Modifiers::MOD4, 200, 200)).unwrap();
        wm.handle_event(WmEvent::DestroyNotify { window: WIN }).unwrap();
        assert!(!wm.drag.is_dragging());
    }

    #[test]
    fn test_grow_floor() {
        assert_eq!(grow(50, -1000, 1), 1);
        assert_eq!(grow(50, 25, 1), 75);
        assert_eq!(grow(150, -20, 100), 130);
    }
}
