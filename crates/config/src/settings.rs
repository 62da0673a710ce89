// Application settings
// Loaded from ~/.config/tabgrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tabgrid_engine::column::{DEFAULT_COLUMN_WIDTH, MIN_FLEX_COLUMN_WIDTH};
use tabgrid_engine::{GridOptions, Mode, Precedence};

use crate::ConfigError;

/// Light/dark preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModePreference {
    /// Follow the terminal background (COLORFGBG), dark if unknown
    #[default]
    Auto,
    Light,
    Dark,
}

impl ModePreference {
    pub fn resolve(self) -> Mode {
        match self {
            ModePreference::Light => Mode::Light,
            ModePreference::Dark => Mode::Dark,
            ModePreference::Auto => std::env::var("COLORFGBG")
                .ok()
                .and_then(|v| mode_from_colorfgbg(&v))
                .unwrap_or(Mode::Dark),
        }
    }
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`) in ANSI color indices.
pub fn mode_from_colorfgbg(value: &str) -> Option<Mode> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(match bg {
        7 | 9..=15 => Mode::Light,
        _ => Mode::Dark,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Grid layout
    #[serde(rename = "grid.rowHeight")]
    pub row_height: f32,

    #[serde(rename = "grid.columnGap")]
    pub column_gap: f32,

    #[serde(rename = "grid.defaultColumnWidth")]
    pub default_column_width: f32,

    #[serde(rename = "grid.minFlexWidth")]
    pub min_flex_width: f32,

    // Appearance
    #[serde(rename = "appearance.mode")]
    pub mode: ModePreference,

    /// Name of the active stylesheet (built-in or file stem)
    #[serde(rename = "appearance.theme")]
    pub theme: String,

    #[serde(rename = "appearance.precedence")]
    pub precedence: Precedence,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Grid
            row_height: 1.0,
            column_gap: 1.0,
            default_column_width: DEFAULT_COLUMN_WIDTH,
            min_flex_width: MIN_FLEX_COLUMN_WIDTH,
            // Appearance
            mode: ModePreference::Auto,
            theme: crate::theme::DEFAULT_THEME.to_string(),
            precedence: Precedence::ModeSpecific,
        }
    }
}

impl Settings {
    /// `~/.config/tabgrid` (platform equivalent)
    pub fn config_dir() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("tabgrid"))
    }

    /// Get the settings file path
    pub fn config_path() -> Option<PathBuf> {
        Some(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Read one settings file. Lines starting with `//` are comments.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Io { path: parent.to_path_buf(), source })?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;

        fs::write(path, json).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    /// Options for a `GridController`, with the mode preference resolved.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            row_height: self.row_height,
            column_gap: self.column_gap,
            default_column_width: self.default_column_width,
            min_flex_width: self.min_flex_width,
            mode: self.mode.resolve(),
        }
    }
}
