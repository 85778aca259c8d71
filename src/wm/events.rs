//! Events Module
//!
//! The window manager's view of the X event stream. Each kind the core
//! reacts to is a variant carrying only the fields its handler reads; the X11
//! session translates raw protocol events into these and drops everything else.

use crate::wm::keyboard::Modifiers;
use crate::wm::session::{StateChange, WindowId};

/// Pointer button press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: u8,
    pub modifiers: Modifiers,
    pub root_x: i32,
    pub root_y: i32,
    /// Child of the root the pointer was over, if any
    pub subwindow: Option<WindowId>,
}

/// Key press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u8,
    pub modifiers: Modifiers,
}

/// Decoded client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    /// `_NET_ACTIVE_WINDOW`
    Activate,
    /// `_NET_CLOSE_WINDOW`
    Close,
    /// `_NET_WM_STATE` touching `_NET_WM_STATE_STICKY`
    Sticky(StateChange),
    /// Anything else, by message type atom
    Other(u32),
}

/// Events dispatched to the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmEvent {
    MapRequest { window: WindowId },
    UnmapNotify { window: WindowId },
    DestroyNotify { window: WindowId },
    PropertyNotify { window: WindowId, atom: u32 },
    MotionNotify { root_x: i32, root_y: i32 },
    ClientMessage { window: WindowId, request: ClientRequest },
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    FocusIn { window: WindowId },
    FocusOut { window: WindowId },
    EnterNotify { window: WindowId },
}

impl WmEvent {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MapRequest { .. } => "MapRequest",
            Self::UnmapNotify { .. } => "UnmapNotify",
            Self::DestroyNotify { .. } => "DestroyNotify",
            Self::PropertyNotify { .. } => "PropertyNotify",
            Self::MotionNotify { .. } => "MotionNotify",
            Self::ClientMessage { .. } => "ClientMessage",
            Self::ButtonPress(_) => "ButtonPress",
            Self::ButtonRelease(_) => "ButtonRelease",
            Self::KeyPress(_) => "KeyPress",
            Self::KeyRelease(_) => "KeyRelease",
            Self::FocusIn { .. } => "FocusIn",
            Self::FocusOut { .. } => "FocusOut",
            Self::EnterNotify { .. } => "EnterNotify",
        }
    }

    /// Window the event is about, if it names one
    pub fn window(&self) -> Option<WindowId> {
        match self {
            Self::MapRequest { window }
            | Self::UnmapNotify { window }
            | Self::DestroyNotify { window }
            | Self::PropertyNotify { window, .. }
            | Self::ClientMessage { window, .. }
            | Self::FocusIn { window }
            | Self::FocusOut { window }
            | Self::EnterNotify { window } => Some(*window),
            Self::ButtonPress(e) | Self::ButtonRelease(e) => e.subwindow,
            Self::MotionNotify { .. } | Self::KeyPress(_) | Self::KeyRelease(_) => None,
        }
    }
}
