//! EWMH (Extended Window Manager Hints) implementation
//!
//! Only the hints a single-desktop floating manager advertises: desktop
//! count, the active window, sticky state and polite closing.

use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::session::SessionResult;

/// Holds all interned atoms
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_active_window: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_close_window: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> SessionResult<Self> {
        let intern = |name: &str| -> SessionResult<Atom> { Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom) };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// Atoms listed in `_NET_SUPPORTED`
    pub fn supported(&self) -> [Atom; 9] {
        [
            self.net_supported,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_active_window,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_wm_state,
            self.net_wm_state_sticky,
            self.net_close_window,
        ]
    }

    /// Set up _NET_SUPPORTED on root window
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window) -> SessionResult<()> {
        conn.change_property32(PropMode::REPLACE, root, self.net_supported, AtomEnum::ATOM, &self.supported())?;
        Ok(())
    }

    /// Point `_NET_SUPPORTING_WM_CHECK` at `check` from both the root and
    /// `check` itself, and name it
    pub fn setup_wm_check<C: Connection>(&self, conn: &C, root: Window, check: Window, name: &str) -> SessionResult<()> {
        for window in [root, check] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check],
            )?;
        }
        conn.change_property8(PropMode::REPLACE, check, self.net_wm_name, self.utf8_string, name.as_bytes())?;
        Ok(())
    }

    /// Update _NET_NUMBER_OF_DESKTOPS and _NET_CURRENT_DESKTOP
    pub fn update_desktops<C: Connection>(&self, conn: &C, root: Window, count: u32, current: u32) -> SessionResult<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_number_of_desktops,
            AtomEnum::CARDINAL,
            &[count],
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_current_desktop,
            AtomEnum::CARDINAL,
            &[current],
        )?;
        Ok(())
    }

    /// Update _NET_ACTIVE_WINDOW, deleting it when there is no active window
    pub fn update_active_window<C: Connection>(&self, conn: &C, root: Window, window: Option<Window>) -> SessionResult<()> {
        match window {
            Some(win) => {
                conn.change_property32(PropMode::REPLACE, root, self.net_active_window, AtomEnum::WINDOW, &[win])?;
            }
            None => {
                conn.delete_property(root, self.net_active_window)?;
            }
        }
        Ok(())
    }

    /// Current `_NET_WM_STATE` atoms of `window`; empty if unset or unreadable
    pub fn window_state<C: Connection>(&self, conn: &C, window: Window) -> SessionResult<Vec<Atom>> {
        let reply = conn
            .get_property(false, window, self.net_wm_state, AtomEnum::ATOM, 0, 1024)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    /// Add or remove one state atom, keeping the others
    pub fn set_window_state<C: Connection>(&self, conn: &C, window: Window, state: Atom, enabled: bool) -> SessionResult<()> {
        let mut states = self.window_state(conn, window)?;
        states.retain(|&a| a != state);
        if enabled {
            states.push(state);
        }

        conn.change_property32(PropMode::REPLACE, window, self.net_wm_state, AtomEnum::ATOM, &states)?;
        Ok(())
    }

    /// Check if window supports WM_DELETE_WINDOW protocol
    pub fn supports_delete_protocol<C: Connection>(&self, conn: &C, window: Window) -> SessionResult<bool> {
        let reply = conn
            .get_property(false, window, self.wm_protocols, AtomEnum::ATOM, 0, 1024)?
            .reply()?;
        Ok(reply
            .value32()
            .is_some_and(|mut protocols| protocols.any(|a| a == self.wm_delete_window)))
    }

    /// Send WM_DELETE_WINDOW message to close a window gracefully
    pub fn send_delete_window<C: Connection>(&self, conn: &C, window: Window) -> SessionResult<()> {
        // data[1] = CurrentTime
        let event = ClientMessageEvent::new(32, window, self.wm_protocols, [self.wm_delete_window, 0, 0, 0, 0]);

        if let Err(e) = conn.send_event(false, window, EventMask::NO_EVENT, event) {
            debug!("Failed to send WM_DELETE_WINDOW to {:#x}: {}", window, e);
            return Err(e.into());
        }
        Ok(())
    }
}
