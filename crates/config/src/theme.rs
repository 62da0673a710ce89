// Theme registry
// Built-in stylesheets plus *.tgss files from ~/.config/tabgrid/themes

use std::fs;
use std::path::{Path, PathBuf};

use tabgrid_engine::StyleResolver;

use crate::ConfigError;

pub const DEFAULT_THEME: &str = "default";

/// File extension of user stylesheets
pub const THEME_EXTENSION: &str = "tgss";

const DEFAULT_SHEET: &str = r#"/* tabgrid default: slate */
fg        = #0f172a / #f1f5f9
bg        = #f8fafc / #0f172a
header-bg = #e2e8f0 / #1e293b
muted     = #475569 / #64748b
accent    = #3b82f6
selection = #dbeafe / #1e3a8a
error     = #dc2626 / #f87171
#-----#
cell            { color: {fg}; background: {bg}; }
header          { color: {muted}; background: {header-bg}; bold: true; }
selected-header { color: {accent}; }
selected-row    { background: {header-bg}; }
selected-cell   { background: {selection}; bold: true; }
dirty           { color: {accent}; italic: true; }
editing         { background: {selection}; underline: true; }
invalid         { color: {error}; }
"#;

const CLASSIC_BLUE_SHEET: &str = r#"/* classic-blue: white on blue, the old text-mode look */
fg     = #000080 / #ffffff
bg     = #c0c0c0 / #000080
hi     = #ffff00
#-----#
cell          { color: {fg}; background: {bg}; }
header        { color: #000000; background: #00aaaa; bold: true; }
selected-cell { color: #000000; background: #00aaaa; }
selected-row:dark  { background: #0000aa; }
selected-row:light { background: #d0d0d0; }
dirty         { color: {hi}; }
editing       { color: #ffffff; background: #000000; }
invalid       { color: #ff5555; bold: true; }
"#;

const PURE_AMBER_SHEET: &str = r#"/* pure-amber: monochrome amber phosphor */
amber = #b45309 / #ffb000
dim   = #78350f / #7a5500
black = #fffbeb / #000000
#-----#
cell          { color: {amber}; background: {black}; }
header        { color: {black}; background: {amber}; bold: true; }
selected-cell { color: {black}; background: {amber}; }
selected-row  { color: {amber}; underline: true; }
dirty         { bold: true; }
editing       { color: {black}; background: {dim}; }
invalid       { color: {dim}; italic: true; }
"#;

const BUILT_INS: &[(&str, &str)] = &[
    (DEFAULT_THEME, DEFAULT_SHEET),
    ("classic-blue", CLASSIC_BLUE_SHEET),
    ("pure-amber", PURE_AMBER_SHEET),
];

/// Where a theme's stylesheet comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeOrigin {
    BuiltIn(&'static str),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeEntry {
    pub name: String,
    pub origin: ThemeOrigin,
}

impl ThemeEntry {
    /// Stylesheet text. File themes are read on every call.
    pub fn source(&self) -> Result<String, ConfigError> {
        match &self.origin {
            ThemeOrigin::BuiltIn(text) => Ok((*text).to_string()),
            ThemeOrigin::File(path) => {
                fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.clone(), source })
            }
        }
    }
}

/// Available themes with a cycling cursor on the active one
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    entries: Vec<ThemeEntry>,
    active: usize,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ThemeRegistry {
    /// Built-in themes only
    pub fn builtin() -> Self {
        let entries = BUILT_INS
            .iter()
            .map(|(name, text)| ThemeEntry { name: name.to_string(), origin: ThemeOrigin::BuiltIn(*text) })
            .collect();
        Self { entries, active: 0 }
    }

    /// Built-ins plus the user themes directory
    pub fn discover() -> Self {
        match Self::themes_dir() {
            Some(dir) => Self::with_dir(&dir),
            None => Self::builtin(),
        }
    }

    /// Built-ins plus every `*.tgss` file in `dir`, sorted by name.
    /// A file named like a built-in is skipped.
    pub fn with_dir(dir: &Path) -> Self {
        let mut registry = Self::builtin();
        let Ok(read_dir) = fs::read_dir(dir) else {
            return registry;
        };

        let mut found: Vec<ThemeEntry> = read_dir
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == THEME_EXTENSION))
            .filter_map(|path| {
                let name = path.file_stem()?.to_string_lossy().to_string();
                Some(ThemeEntry { name, origin: ThemeOrigin::File(path) })
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in found {
            if registry.position(&entry.name).is_some() {
                log::warn!("theme '{}' shadows a built-in; skipped", entry.name);
                continue;
            }
            registry.entries.push(entry);
        }
        registry
    }

    /// Get the custom themes directory path
    pub fn themes_dir() -> Option<PathBuf> {
        Some(crate::Settings::config_dir()?.join("themes"))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn entries(&self) -> &[ThemeEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn active(&self) -> &ThemeEntry {
        &self.entries[self.active]
    }

    pub fn active_name(&self) -> &str {
        &self.active().name
    }

    pub fn select(&mut self, name: &str) -> Result<(), ConfigError> {
        let index = self.position(name).ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))?;
        self.active = index;
        Ok(())
    }

    /// Advance to the next theme, wrapping around. Returns its name.
    pub fn next(&mut self) -> &str {
        self.active = (self.active + 1) % self.entries.len();
        self.active_name()
    }

    /// Step back to the previous theme, wrapping around.
    pub fn previous(&mut self) -> &str {
        self.active = (self.active + self.entries.len() - 1) % self.entries.len();
        self.active_name()
    }

    /// Load the active theme into `resolver`. On error the resolver keeps
    /// its current rules.
    pub fn apply(&self, resolver: &StyleResolver) -> Result<(), ConfigError> {
        let entry = self.active();
        let text = entry.source()?;
        resolver
            .load_document(&text)
            .map_err(|source| ConfigError::Stylesheet { theme: entry.name.clone(), source })?;
        log::debug!("applied theme '{}'", entry.name);
        Ok(())
    }
}
