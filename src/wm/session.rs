//! Display Session
//!
//! The seam between the window manager core and the X server. Every request the
//! event handlers issue goes through [`DisplaySession`], so the core can be
//! driven by the real X11 connection or by a fake in tests.

use thiserror::Error;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error;

use crate::shared::Geometry;

/// Server-side window handle. The null handle is represented as `None`.
pub type WindowId = u32;

/// X keysym value
pub type Keysym = u32;

/// Pointer glyphs the manager switches between during a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorGlyph {
    Default,
    Move,
    Resize,
}

/// How a `_NET_WM_STATE` style request changes a boolean state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Remove,
    Add,
    Toggle,
}

impl StateChange {
    /// Decode the EWMH action field (0 = remove, 1 = add, 2 = toggle)
    pub fn from_ewmh(action: u32) -> Option<Self> {
        match action {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    pub fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection to the X server failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0:?}")]
    Protocol(X11Error),

    #[error("X11 resource ids exhausted")]
    IdsExhausted,

    #[error("window {0:#x} is not available")]
    BadWindow(WindowId),

    #[error("color {0:?} is not known to the server")]
    UnknownColor(String),
}

impl SessionError {
    /// Whether the event loop can keep going after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::IdsExhausted)
    }

    /// Report a BadWindow or BadDrawable from a request on `window` as
    /// [`SessionError::BadWindow`]
    pub fn for_window(self, window: WindowId) -> Self {
        match self {
            Self::Protocol(ref e) if matches!(e.error_kind, ErrorKind::Window | ErrorKind::Drawable) => {
                Self::BadWindow(window)
            }
            other => other,
        }
    }
}

impl From<ReplyError> for SessionError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::ConnectionError(e) => Self::Connection(e),
            ReplyError::X11Error(e) => Self::Protocol(e),
        }
    }
}

impl From<ReplyOrIdError> for SessionError {
    fn from(err: ReplyOrIdError) -> Self {
        match err {
            ReplyOrIdError::IdsExhausted => Self::IdsExhausted,
            ReplyOrIdError::ConnectionError(e) => Self::Connection(e),
            ReplyOrIdError::X11Error(e) => Self::Protocol(e),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Primitives the window manager core needs from the display server.
///
/// Requests are issued in order; implementations may buffer them until
/// [`DisplaySession::flush`].
pub trait DisplaySession {
    /// The root window of the managed screen
    fn root(&self) -> WindowId;

    /// Size of the managed screen in pixels
    fn screen_size(&self) -> (u32, u32);

    fn window_geometry(&mut self, window: WindowId) -> SessionResult<Geometry>;

    /// Pointer position relative to the root window
    fn pointer_position(&mut self) -> SessionResult<(i32, i32)>;

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()>;

    fn resize_window(&mut self, window: WindowId, width: u32, height: u32) -> SessionResult<()>;

    fn move_resize_window(&mut self, window: WindowId, geometry: Geometry) -> SessionResult<()>;

    fn raise_window(&mut self, window: WindowId) -> SessionResult<()>;

    fn map_window(&mut self, window: WindowId) -> SessionResult<()>;

    fn set_border_width(&mut self, window: WindowId, width: u32) -> SessionResult<()>;

    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> SessionResult<()>;

    fn set_input_focus(&mut self, window: WindowId) -> SessionResult<()>;

    fn set_cursor(&mut self, window: WindowId, glyph: CursorGlyph) -> SessionResult<()>;

    /// Move the pointer to `(x, y)` relative to `window`'s origin
    fn warp_pointer(&mut self, window: WindowId, x: i32, y: i32) -> SessionResult<()>;

    /// Publish `_NET_ACTIVE_WINDOW`, or delete it when `window` is `None`
    fn publish_active_window(&mut self, window: Option<WindowId>) -> SessionResult<()>;

    /// Publish `_NET_NUMBER_OF_DESKTOPS` and `_NET_CURRENT_DESKTOP`
    fn publish_desktops(&mut self, count: u32, current: u32) -> SessionResult<()>;

    /// Liveness check. Protocol errors are swallowed and reported as `false`.
    fn window_exists(&mut self, window: WindowId) -> bool;

    /// Whether `_NET_WM_STATE` of `window` carries `_NET_WM_STATE_STICKY`
    fn is_sticky(&mut self, window: WindowId) -> bool;

    fn set_sticky(&mut self, window: WindowId, sticky: bool) -> SessionResult<()>;

    /// Subscribe to enter, focus, property and structure events of a client
    fn select_client_events(&mut self, window: WindowId) -> SessionResult<()>;

    /// Mapped, non override-redirect children of the root
    fn existing_windows(&mut self) -> SessionResult<Vec<WindowId>>;

    /// Politely ask `window` to close, killing the client if it does not
    /// speak `WM_DELETE_WINDOW`
    fn close_window(&mut self, window: WindowId) -> SessionResult<()>;

    /// Keysym of `keycode` in group 0, level 0
    fn keycode_to_keysym(&self, keycode: u8) -> Keysym;

    /// Resolve a color name (`#rrggbb` or a server color name) to a pixel
    fn alloc_color(&mut self, name: &str) -> SessionResult<u32>;

    fn black_pixel(&self) -> u32;

    fn flush(&mut self) -> SessionResult<()>;
}
