use std::fmt;
use std::path::PathBuf;

use tabgrid_engine::GridError;

/// Errors from reading or writing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    /// A stylesheet failed to parse or compile.
    Stylesheet { theme: String, source: GridError },
    UnknownTheme(String),
    /// The platform has no config directory.
    NoConfigDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Json { path, source } => write!(f, "{}: invalid JSON: {}", path.display(), source),
            Self::Stylesheet { theme, source } => write!(f, "theme '{theme}': {source}"),
            Self::UnknownTheme(name) => write!(f, "unknown theme '{name}'"),
            Self::NoConfigDir => write!(f, "could not determine config directory"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Stylesheet { source, .. } => Some(source),
            _ => None,
        }
    }
}
