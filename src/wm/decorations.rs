//! Border decorations
//!
//! Perch draws no frames; a window's only decoration is its X border, colored
//! from a four-entry palette resolved once at startup.

use tracing::{debug, warn};

use crate::config::BorderColors;
use crate::wm::session::DisplaySession;

/// Border pixels for every active/sticky combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderPalette {
    pub normal_active: u32,
    pub normal_inactive: u32,
    pub sticky_active: u32,
    pub sticky_inactive: u32,
}

impl BorderPalette {
    /// Allocate the configured colors. Names the server cannot resolve fall
    /// back to black.
    pub fn resolve<S: DisplaySession>(session: &mut S, colors: &BorderColors) -> Self {
        let black = session.black_pixel();
        let mut alloc = |name: &str| match session.alloc_color(name) {
            Ok(pixel) => {
                debug!("Border color {:?} -> pixel {:#x}", name, pixel);
                pixel
            }
            Err(e) => {
                warn!("Failed to allocate border color {:?}, using black: {}", name, e);
                black
            }
        };

        Self {
            normal_active: alloc(&colors.normal_active),
            normal_inactive: alloc(&colors.normal_inactive),
            sticky_active: alloc(&colors.sticky_active),
            sticky_inactive: alloc(&colors.sticky_inactive),
        }
    }

    pub fn pixel(&self, active: bool, sticky: bool) -> u32 {
        match (active, sticky) {
            (true, false) => self.normal_active,
            (false, false) => self.normal_inactive,
            (true, true) => self.sticky_active,
            (false, true) => self.sticky_inactive,
        }
    }
}

/// Parse `#rrggbb` into 16-bit-per-channel RGB as the core protocol expects
pub fn parse_hex_color(name: &str) -> Option<(u16, u16, u16)> {
    let hex = name.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| u16::from(v) * 0x101);
    Some((channel(0)?, channel(2)?, channel(4)?))
}
