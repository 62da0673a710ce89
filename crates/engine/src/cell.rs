use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Snapshot of one grid position, as handed out by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub value: Value,
    /// Per-cell style tag; row and column styling are layered separately.
    pub style_tag: Option<String>,
    /// True iff `value` differs from the last value acknowledged as saved.
    pub dirty: bool,
}

impl Cell {
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Stored state behind a cell. Absent slots are empty, clean and unstyled.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Slot {
    pub value: Value,
    /// Value most recently acknowledged as saved by the caller.
    pub saved: Value,
    pub style_tag: Option<String>,
}

impl Slot {
    pub fn is_dirty(&self) -> bool {
        self.value != self.saved
    }

    /// A slot with nothing worth keeping can be dropped from sparse storage.
    pub fn is_vacant(&self) -> bool {
        self.value.is_null() && self.saved.is_null() && self.style_tag.is_none()
    }

    pub fn to_cell(&self, row: usize, col: usize) -> Cell {
        Cell {
            row,
            col,
            value: self.value.clone(),
            style_tag: self.style_tag.clone(),
            dirty: self.is_dirty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_default_is_vacant_and_clean() {
        let slot = Slot::default();
        assert!(slot.is_vacant());
        assert!(!slot.is_dirty());
    }

    #[test]
    fn test_slot_dirty_tracks_saved_baseline() {
        let mut slot = Slot { value: Value::from(1), saved: Value::from(1), style_tag: None };
        assert!(!slot.is_dirty());
        slot.value = Value::from(2);
        assert!(slot.is_dirty());
        slot.value = Value::from(1);
        assert!(!slot.is_dirty());
    }

    #[test]
    fn test_to_cell_copies_state() {
        let slot = Slot {
            value: Value::text("x"),
            saved: Value::Null,
            style_tag: Some("warn".into()),
        };
        let cell = slot.to_cell(3, 4);
        assert_eq!(cell.position(), (3, 4));
        assert_eq!(cell.style_tag.as_deref(), Some("warn"));
        assert!(cell.dirty);
    }
}
