//! CLI Exit Code Registry
//!
//! Every exit code `tgrid` can return is defined here. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                              |
//! |---------|-------------|------------------------------------------|
//! | 0       | Universal   | Success                                  |
//! | 1       | Universal   | General error (unspecified)              |
//! | 2       | Universal   | CLI usage error (bad args, missing file) |
//! | 3-9     | data        | Reading or writing table files           |
//! | 10-19   | style       | Stylesheet parse/compile failures        |
//! | 20-29   | config      | Settings and theme lookup                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above

use tabgrid_config::ConfigError;
use tabgrid_engine::GridError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Data (3-9)
// =============================================================================

/// Input file could not be opened or output could not be written.
pub const EXIT_DATA_IO: u8 = 3;

/// Input file is not valid CSV/TSV.
pub const EXIT_DATA_PARSE: u8 = 4;

/// Loaded data was rejected by the grid (value does not fit its column).
pub const EXIT_DATA_REJECTED: u8 = 5;

// =============================================================================
// Style (10-19)
// =============================================================================

/// Stylesheet syntax error.
pub const EXIT_STYLE_PARSE: u8 = 10;

/// Stylesheet references an undeclared variable.
pub const EXIT_STYLE_UNKNOWN_VARIABLE: u8 = 11;

// =============================================================================
// Config (20-29)
// =============================================================================

/// Settings file unreadable or not valid JSON.
pub const EXIT_CONFIG: u8 = 20;

/// `--theme` names a theme that does not exist.
pub const EXIT_CONFIG_UNKNOWN_THEME: u8 = 21;

/// Map a GridError to its exit code.
pub fn grid_exit_code(err: &GridError) -> u8 {
    match err {
        GridError::StyleParse { .. } => EXIT_STYLE_PARSE,
        GridError::UnknownVariable { .. } => EXIT_STYLE_UNKNOWN_VARIABLE,
        GridError::InvalidValue { .. } | GridError::OutOfBounds { .. } => EXIT_DATA_REJECTED,
        _ => EXIT_ERROR,
    }
}

/// Map a ConfigError to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Stylesheet { source, .. } => grid_exit_code(source),
        ConfigError::UnknownTheme(_) => EXIT_CONFIG_UNKNOWN_THEME,
        ConfigError::Io { .. } | ConfigError::Json { .. } | ConfigError::NoConfigDir => EXIT_CONFIG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabgrid_engine::ValueKind;

    #[test]
    fn style_errors_map_to_style_range() {
        let parse = GridError::StyleParse { line: Some(3), message: "expected '{'".into() };
        assert_eq!(grid_exit_code(&parse), EXIT_STYLE_PARSE);

        let unknown = GridError::UnknownVariable { name: "accent".into(), selector: "header".into() };
        assert_eq!(grid_exit_code(&unknown), EXIT_STYLE_UNKNOWN_VARIABLE);

        let wrapped = ConfigError::Stylesheet { theme: "mine".into(), source: unknown };
        assert_eq!(config_exit_code(&wrapped), EXIT_STYLE_UNKNOWN_VARIABLE);
    }

    #[test]
    fn data_errors_map_to_data_range() {
        let err = GridError::InvalidValue {
            row: 0,
            col: 1,
            kind: ValueKind::Number,
            reason: "'x' is not a number".into(),
        };
        assert_eq!(grid_exit_code(&err), EXIT_DATA_REJECTED);
        assert_eq!(grid_exit_code(&GridError::NoActiveSession), EXIT_ERROR);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_DATA_IO,
            EXIT_DATA_PARSE,
            EXIT_DATA_REJECTED,
            EXIT_STYLE_PARSE,
            EXIT_STYLE_UNKNOWN_VARIABLE,
            EXIT_CONFIG,
            EXIT_CONFIG_UNKNOWN_THEME,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
