//! Configuration system for Perch
//!
//! Loads configuration from TOML file at `~/.config/perch/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::actions::{Action, Direction};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub behavior: BehaviorConfig,
    pub keybindings: Vec<KeyBindingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appearance: AppearanceConfig::default(),
            behavior: BehaviorConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {path:?}"))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("perch");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Border geometry and colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Border width in pixels
    pub border_width: u32,
    pub colors: BorderColors,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            border_width: 2,
            colors: BorderColors::default(),
        }
    }
}

/// Border colors, as `#rrggbb` or a server color name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderColors {
    pub normal_active: String,
    pub normal_inactive: String,
    pub sticky_active: String,
    pub sticky_inactive: String,
}

impl Default for BorderColors {
    fn default() -> Self {
        // Nord
        Self {
            normal_active: "#5e81ac".to_string(),   // Frost Blue
            normal_inactive: "#3b4252".to_string(), // Polar Night Lighter
            sticky_active: "#a3be8c".to_string(),   // Aurora Green
            sticky_inactive: "#4c566a".to_string(), // Polar Night Lightest
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Modifiers held for pointer move/resize, e.g. `["Mod4"]`
    pub drag_modifier: Vec<String>,
    /// Value advertised as `_NET_NUMBER_OF_DESKTOPS`
    pub desktops: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            drag_modifier: vec!["Mod4".to_string()],
            desktops: 1,
        }
    }
}

/// One `[[keybindings]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindingConfig {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub key: String,
    pub action: Action,
}

impl KeyBindingConfig {
    pub fn new(modifiers: &[&str], key: &str, action: Action) -> Self {
        Self {
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            key: key.to_string(),
            action,
        }
    }
}

/// Default bindings: vi keys move, shifted vi keys resize, arrows snap
pub fn default_keybindings() -> Vec<KeyBindingConfig> {
    const STEP: i32 = 20;
    let super_ = &["Mod4"][..];
    let super_shift = &["Mod4", "Shift"][..];

    vec![
        KeyBindingConfig::new(super_, "Return", Action::Spawn("xterm".to_string())),
        KeyBindingConfig::new(super_, "q", Action::Close),
        KeyBindingConfig::new(super_shift, "e", Action::Quit),
        KeyBindingConfig::new(super_, "h", Action::MoveX(-STEP)),
        KeyBindingConfig::new(super_, "l", Action::MoveX(STEP)),
        KeyBindingConfig::new(super_, "k", Action::MoveY(-STEP)),
        KeyBindingConfig::new(super_, "j", Action::MoveY(STEP)),
        KeyBindingConfig::new(super_shift, "h", Action::ResizeX(-STEP)),
        KeyBindingConfig::new(super_shift, "l", Action::ResizeX(STEP)),
        KeyBindingConfig::new(super_shift, "k", Action::ResizeY(-STEP)),
        KeyBindingConfig::new(super_shift, "j", Action::ResizeY(STEP)),
        KeyBindingConfig::new(super_, "Up", Action::Snap(Direction::Up)),
        KeyBindingConfig::new(super_, "Down", Action::Snap(Direction::Down)),
        KeyBindingConfig::new(super_, "Left", Action::Snap(Direction::Left)),
        KeyBindingConfig::new(super_, "Right", Action::Snap(Direction::Right)),
        KeyBindingConfig::new(super_, "c", Action::Center),
        KeyBindingConfig::new(super_, "s", Action::ToggleSticky),
    ]
}
