//! Keyboard Module
//!
//! Modifier masks, key names and the keybinding table. Bindings are matched
//! in table order and the first one whose keysym and modifiers both match
//! exactly wins.

use bitflags::bitflags;
use tracing::{debug, warn};
use x11_dl::keysym;

use crate::config::KeyBindingConfig;
use crate::wm::actions::Action;
use crate::wm::session::Keysym;

bitflags! {
    /// Core protocol modifier bits, as carried in the `state` field of input events
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD3    = 1 << 5;
        const MOD4    = 1 << 6;
        const MOD5    = 1 << 7;
    }
}

impl Modifiers {
    /// Bits taken into account when comparing against a binding. Lock and
    /// Mod5 are dropped, as are the pointer button bits above them.
    pub const CANONICAL: Self = Self::SHIFT
        .union(Self::CONTROL)
        .union(Self::MOD1)
        .union(Self::MOD2)
        .union(Self::MOD3)
        .union(Self::MOD4);

    /// Build from an event `state` field, keeping only modifier bits
    pub fn from_state(state: u16) -> Self {
        Self::from_bits_truncate(state)
    }

    pub fn canonical(self) -> Self {
        self & Self::CANONICAL
    }

    /// Parse a single modifier name (`Mod4`, `Super`, `Alt`, `Shift`, ...)
    pub fn from_modifier_name(name: &str) -> Option<Self> {
        let m = match name.to_ascii_lowercase().as_str() {
            "shift" => Self::SHIFT,
            "lock" | "capslock" => Self::LOCK,
            "control" | "ctrl" => Self::CONTROL,
            "mod1" | "alt" => Self::MOD1,
            "mod2" => Self::MOD2,
            "mod3" => Self::MOD3,
            "mod4" | "super" | "win" => Self::MOD4,
            "mod5" => Self::MOD5,
            _ => return None,
        };
        Some(m)
    }

    /// Parse a list of modifier names into one mask
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        names
            .iter()
            .try_fold(Self::empty(), |acc, name| Some(acc | Self::from_modifier_name(name.as_ref())?))
    }
}

/// Resolve a key name to its keysym.
///
/// Single letters and digits map to their Latin-1 keysym (letters always to
/// the lowercase one, since lookups use level 0). Longer names follow the X
/// keysym names without the `XK_` prefix.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c {
            'a'..='z' | 'A'..='Z' => Some(keysym::XK_a + (c.to_ascii_lowercase() as u32 - 'a' as u32)),
            '0'..='9' => Some(keysym::XK_0 + (c as u32 - '0' as u32)),
            '-' => Some(keysym::XK_minus),
            '=' => Some(keysym::XK_equal),
            ',' => Some(keysym::XK_comma),
            '.' => Some(keysym::XK_period),
            '/' => Some(keysym::XK_slash),
            ';' => Some(keysym::XK_semicolon),
            '[' => Some(keysym::XK_bracketleft),
            ']' => Some(keysym::XK_bracketright),
            _ => None,
        };
    }

    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=12).contains(&n).then(|| keysym::XK_F1 + (n - 1));
    }

    let sym = match name {
        "Return" | "Enter" => keysym::XK_Return,
        "space" | "Space" => keysym::XK_space,
        "Tab" => keysym::XK_Tab,
        "Escape" => keysym::XK_Escape,
        "BackSpace" => keysym::XK_BackSpace,
        "Delete" => keysym::XK_Delete,
        "Home" => keysym::XK_Home,
        "End" => keysym::XK_End,
        "Prior" | "Page_Up" => keysym::XK_Prior,
        "Next" | "Page_Down" => keysym::XK_Next,
        "Left" => keysym::XK_Left,
        "Right" => keysym::XK_Right,
        "Up" => keysym::XK_Up,
        "Down" => keysym::XK_Down,
        "Print" => keysym::XK_Print,
        "minus" => keysym::XK_minus,
        "equal" => keysym::XK_equal,
        "comma" => keysym::XK_comma,
        "period" => keysym::XK_period,
        "slash" => keysym::XK_slash,
        "backslash" => keysym::XK_backslash,
        "semicolon" => keysym::XK_semicolon,
        "apostrophe" => keysym::XK_apostrophe,
        "grave" => keysym::XK_grave,
        "bracketleft" => keysym::XK_bracketleft,
        "bracketright" => keysym::XK_bracketright,
        _ => return None,
    };
    Some(sym)
}

/// Key binding
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    /// Exact modifier mask, already canonical
    pub modifiers: Modifiers,
    pub keysym: Keysym,
    pub action: Action,
}

impl KeyBinding {
    pub fn new(modifiers: Modifiers, keysym: Keysym, action: Action) -> Self {
        Self {
            modifiers: modifiers.canonical(),
            keysym,
            action,
        }
    }

    pub fn matches(&self, keysym: Keysym, modifiers: Modifiers) -> bool {
        self.keysym == keysym && self.modifiers == modifiers.canonical()
    }
}

/// Ordered keybinding table
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Keymap {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    /// Build the table from configuration, skipping entries with unknown
    /// modifier or key names
    pub fn from_config(entries: &[KeyBindingConfig]) -> Self {
        let bindings = entries
            .iter()
            .filter_map(|entry| {
                let Some(modifiers) = Modifiers::from_names(&entry.modifiers) else {
                    warn!("Skipping binding for {:?}: unknown modifier in {:?}", entry.key, entry.modifiers);
                    return None;
                };
                let Some(keysym) = keysym_from_name(&entry.key) else {
                    warn!("Skipping binding: unknown key name {:?}", entry.key);
                    return None;
                };
                Some(KeyBinding::new(modifiers, keysym, entry.action.clone()))
            })
            .collect::<Vec<_>>();

        debug!("Loaded {} key bindings", bindings.len());
        Self::new(bindings)
    }

    /// First binding matching the key and exact modifiers
    pub fn lookup(&self, keysym: Keysym, modifiers: Modifiers) -> Option<&KeyBinding> {
        self.bindings.iter().find(|b| b.matches(keysym, modifiers))
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }
}
