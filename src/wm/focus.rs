//! Focus Module
//!
//! The active window and the border styling that follows it.

use anyhow::Result;
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::session::{DisplaySession, WindowId};

/// The single active (focused) window, if any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    active: Option<WindowId>,
}

impl ActiveWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<WindowId> {
        self.active
    }

    pub fn set(&mut self, window: WindowId) {
        self.active = Some(window);
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn is(&self, window: WindowId) -> bool {
        self.active == Some(window)
    }
}

impl<S: DisplaySession> WindowManager<S> {
    /// Make `window` the active window: restyle borders and publish it.
    pub fn activate(&mut self, window: Option<WindowId>) -> Result<()> {
        let Some(window) = window else {
            return Ok(());
        };
        self.set_active_border(window)?;
        self.set_active_window(Some(window))
    }

    /// Reset the previous active window to the inactive style and give
    /// `window` the active one.
    fn set_active_border(&mut self, window: WindowId) -> Result<()> {
        if let Some(previous) = self.focus.get().filter(|&w| w != window) {
            if self.session.window_exists(previous) {
                self.paint_border(previous, false)?;
            } else {
                debug!("Previously active window {:#x} is gone, not restyling it", previous);
            }
        }
        self.paint_border(window, true)
    }

    /// Publish `window` as `_NET_ACTIVE_WINDOW` and remember it; `None` clears both.
    pub fn set_active_window(&mut self, window: Option<WindowId>) -> Result<()> {
        self.session.publish_active_window(window)?;
        match window {
            Some(w) => {
                debug!("Active window is now {:#x}", w);
                self.focus.set(w);
            }
            None => {
                debug!("Active window cleared");
                self.focus.clear();
            }
        }
        Ok(())
    }

    /// Apply border width and the palette color for the window's current
    /// sticky state.
    pub(crate) fn paint_border(&mut self, window: WindowId, active: bool) -> Result<()> {
        let sticky = self.session.is_sticky(window);
        let pixel = self.palette.pixel(active, sticky);
        self.session.set_border_width(window, self.border_width)?;
        self.session.set_border_color(window, pixel)?;
        Ok(())
    }

    /// Drop the active window if `window` was it
    pub(crate) fn forget_window(&mut self, window: WindowId) -> Result<()> {
        if self.focus.is(window) {
            self.set_active_window(None)?;
        }
        Ok(())
    }
}
