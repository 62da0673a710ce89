use std::fmt;

use crate::column::ValueKind;
use crate::edit::EditState;

/// Every failure the grid engine can report.
///
/// Nothing in the engine retries or swallows one of these; recovery is
/// always up to the caller (re-edit, re-submit a stylesheet, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Index outside the declared row/column extent.
    OutOfBounds { row: usize, col: usize, rows: usize, cols: usize },
    /// Value does not fit the column's kind. Recoverable while editing.
    InvalidValue { row: usize, col: usize, kind: ValueKind, reason: String },
    /// The column does not allow interactive editing.
    NotEditable { col: usize },
    /// Another edit session is still open.
    EditInProgress { row: usize, col: usize },
    /// No edit session is open (or the session already finished).
    NoActiveSession,
    /// Session operation not allowed in the session's current state.
    InvalidTransition { state: EditState, action: &'static str },
    /// Malformed stylesheet or rule set.
    StyleParse { line: Option<usize>, message: String },
    /// A rule references a variable that was never declared.
    UnknownVariable { name: String, selector: String },
}

impl GridError {
    pub(crate) fn style(line: Option<usize>, message: impl Into<String>) -> Self {
        Self::StyleParse { line, message: message.into() }
    }

    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::InvalidValue { .. } => "invalid_value",
            Self::NotEditable { .. } => "not_editable",
            Self::EditInProgress { .. } => "edit_in_progress",
            Self::NoActiveSession => "no_active_session",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StyleParse { .. } => "style_parse_error",
            Self::UnknownVariable { .. } => "unknown_variable",
        }
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { row, col, rows, cols } => {
                write!(f, "cell ({row}, {col}) is outside the {rows}x{cols} grid")
            }
            Self::InvalidValue { row, col, kind, reason } => {
                write!(f, "invalid {kind} value for cell ({row}, {col}): {reason}")
            }
            Self::NotEditable { col } => write!(f, "column {col} is not editable"),
            Self::EditInProgress { row, col } => {
                write!(f, "cell ({row}, {col}) is already being edited")
            }
            Self::NoActiveSession => write!(f, "no edit session is active"),
            Self::InvalidTransition { state, action } => {
                write!(f, "cannot {action} while session is {state:?}")
            }
            Self::StyleParse { line: Some(line), message } => {
                write!(f, "stylesheet line {line}: {message}")
            }
            Self::StyleParse { line: None, message } => write!(f, "stylesheet: {message}"),
            Self::UnknownVariable { name, selector } => {
                write!(f, "rule '{selector}' references unknown variable '{name}'")
            }
        }
    }
}

impl std::error::Error for GridError {}

pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_out_of_bounds() {
        let err = GridError::OutOfBounds { row: 7, col: 1, rows: 5, cols: 3 };
        assert_eq!(err.to_string(), "cell (7, 1) is outside the 5x3 grid");
        assert_eq!(err.code(), "out_of_bounds");
    }

    #[test]
    fn test_display_style_errors() {
        let err = GridError::style(Some(4), "expected '{'");
        assert_eq!(err.to_string(), "stylesheet line 4: expected '{'");

        let err = GridError::UnknownVariable { name: "accent".into(), selector: "header".into() };
        assert_eq!(err.to_string(), "rule 'header' references unknown variable 'accent'");
    }

    #[test]
    fn test_display_invalid_value_names_kind() {
        let err = GridError::InvalidValue {
            row: 2,
            col: 1,
            kind: ValueKind::Number,
            reason: "'abc' is not a number".into(),
        };
        assert!(err.to_string().starts_with("invalid number value"));
    }
}
