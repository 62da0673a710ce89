//! Column definitions: label, width, value kind and editability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Smallest width a column may have. Widths are never zero or negative.
pub const MIN_COLUMN_WIDTH: f32 = 1.0;

/// Smallest width a flexible column is shrunk to on resize.
pub const MIN_FLEX_COLUMN_WIDTH: f32 = 5.0;

/// Width given to columns that are created without an explicit width.
pub const DEFAULT_COLUMN_WIDTH: f32 = 12.0;

/// The kind of value a column holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Text,
    Number,
    Boolean,
    /// Holds anything the caller puts there; never editable interactively.
    Readonly,
}

impl ValueKind {
    /// Whether `value` may be stored as-is in a column of this kind.
    ///
    /// `Null` fits every kind (clearing a cell).
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueKind::Readonly, _) => true,
            (ValueKind::Text, Value::Text(_)) => true,
            (ValueKind::Number, Value::Number(_)) => true,
            (ValueKind::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Coerce a draft into a value of this kind.
    ///
    /// Text drafts are parsed for number and boolean columns; blank text
    /// becomes `Null`. The error string is a human-readable reason.
    pub fn coerce(self, draft: &Value) -> Result<Value, String> {
        if let Value::Text(s) = draft {
            if s.trim().is_empty() {
                return Ok(Value::Null);
            }
        }

        match self {
            ValueKind::Readonly => Ok(draft.clone()),
            ValueKind::Text => Ok(match draft {
                Value::Null => Value::Null,
                other => Value::Text(other.display()),
            }),
            ValueKind::Number => match draft {
                Value::Null | Value::Number(_) => Ok(draft.clone()),
                Value::Text(s) => parse_number(s).map(Value::number),
                Value::Bool(_) => Err(format!("'{}' is not a number", draft.display())),
            },
            ValueKind::Boolean => match draft {
                Value::Null | Value::Bool(_) => Ok(draft.clone()),
                Value::Text(s) => parse_bool(s).map(Value::Bool),
                Value::Number(n) if n.0 == 0.0 => Ok(Value::Bool(false)),
                Value::Number(n) if n.0 == 1.0 => Ok(Value::Bool(true)),
                Value::Number(_) => Err(format!("'{}' is not a boolean", draft.display())),
            },
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Readonly => "readonly",
        };
        f.write_str(name)
    }
}

/// Parse user input as a number.
///
/// Whitespace is trimmed and a leading `+` is allowed. Non-finite results
/// (`inf`, `NaN`) are rejected.
fn parse_number(input: &str) -> Result<f64, String> {
    let trimmed = input.trim();
    let normalized = trimmed.strip_prefix('+').unwrap_or(trimmed);

    match normalized.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(format!("'{}' is not a number", trimmed)),
    }
}

fn parse_bool(input: &str) -> Result<bool, String> {
    let trimmed = input.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "x" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(format!("'{}' is not a boolean", trimmed)),
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// A column of the grid. Position in the column list is its index and its
/// display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    pub width: f32,
    pub editable: bool,
    pub kind: ValueKind,
    pub alignment: Alignment,
    /// Flexible columns share the leftover container width on resize.
    #[serde(default)]
    pub flexible: bool,
}

impl Column {
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        let alignment = match kind {
            ValueKind::Number => Alignment::Right,
            ValueKind::Boolean => Alignment::Center,
            _ => Alignment::Left,
        };
        Self {
            label: label.into(),
            width: DEFAULT_COLUMN_WIDTH,
            editable: kind != ValueKind::Readonly,
            kind,
            alignment,
            flexible: false,
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Text)
    }

    pub fn number(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Number)
    }

    pub fn boolean(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Boolean)
    }

    pub fn readonly(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Readonly)
    }

    /// Set the width, clamped to `MIN_COLUMN_WIDTH`.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = sanitize_width(width);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Keep the kind but forbid interactive editing.
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    pub fn is_editable(&self) -> bool {
        self.editable && self.kind != ValueKind::Readonly
    }
}

/// Clamp a width to a positive, finite value.
pub(crate) fn sanitize_width(width: f32) -> f32 {
    if width.is_finite() {
        width.max(MIN_COLUMN_WIDTH)
    } else {
        MIN_COLUMN_WIDTH
    }
}

/// Convert 0-based column index to Excel-style letter(s).
///
/// Used as the label of columns created by a resize.
pub fn column_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_by_kind() {
        assert!(ValueKind::Text.accepts(&Value::text("a")));
        assert!(!ValueKind::Text.accepts(&Value::from(1)));
        assert!(ValueKind::Number.accepts(&Value::from(1)));
        assert!(!ValueKind::Number.accepts(&Value::text("1")));
        assert!(ValueKind::Boolean.accepts(&Value::Bool(true)));
        assert!(ValueKind::Readonly.accepts(&Value::text("anything")));
        for kind in [ValueKind::Text, ValueKind::Number, ValueKind::Boolean, ValueKind::Readonly] {
            assert!(kind.accepts(&Value::Null), "{kind} should accept null");
        }
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(ValueKind::Number.coerce(&Value::text("42")), Ok(Value::from(42)));
        assert_eq!(ValueKind::Number.coerce(&Value::text(" +3.5 ")), Ok(Value::number(3.5)));
        assert_eq!(ValueKind::Number.coerce(&Value::text("")), Ok(Value::Null));
        assert!(ValueKind::Number.coerce(&Value::text("abc")).is_err());
        assert!(ValueKind::Number.coerce(&Value::text("inf")).is_err());
        assert!(ValueKind::Number.coerce(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(ValueKind::Boolean.coerce(&Value::text("Yes")), Ok(Value::Bool(true)));
        assert_eq!(ValueKind::Boolean.coerce(&Value::text("x")), Ok(Value::Bool(true)));
        assert_eq!(ValueKind::Boolean.coerce(&Value::text("0")), Ok(Value::Bool(false)));
        assert_eq!(ValueKind::Boolean.coerce(&Value::from(1)), Ok(Value::Bool(true)));
        assert!(ValueKind::Boolean.coerce(&Value::text("maybe")).is_err());
        assert!(ValueKind::Boolean.coerce(&Value::from(2)).is_err());
    }

    #[test]
    fn test_coerce_text_stringifies() {
        assert_eq!(ValueKind::Text.coerce(&Value::from(7)), Ok(Value::text("7")));
        assert_eq!(ValueKind::Text.coerce(&Value::Bool(true)), Ok(Value::text("true")));
        assert_eq!(ValueKind::Text.coerce(&Value::text("  ")), Ok(Value::Null));
    }

    #[test]
    fn test_column_defaults() {
        let col = Column::number("Qty");
        assert_eq!(col.alignment, Alignment::Right);
        assert!(col.is_editable());
        assert_eq!(col.width, DEFAULT_COLUMN_WIDTH);

        let ro = Column::readonly("Id");
        assert!(!ro.is_editable());

        let locked = Column::text("Name").read_only();
        assert_eq!(locked.kind, ValueKind::Text);
        assert!(!locked.is_editable());
    }

    #[test]
    fn test_width_never_zero_or_negative() {
        assert_eq!(Column::text("a").with_width(0.0).width, MIN_COLUMN_WIDTH);
        assert_eq!(Column::text("a").with_width(-5.0).width, MIN_COLUMN_WIDTH);
        assert_eq!(Column::text("a").with_width(f32::NAN).width, MIN_COLUMN_WIDTH);
        assert_eq!(Column::text("a").with_width(20.0).width, 20.0);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }
}
