//! Single-cell edit sessions.
//!
//! ```text
//! Editing --validate--> Validating --apply--> Committing --> Committed
//!    ^                      |
//!    +---- invalid draft ---+
//! Editing | Validating --cancel--> Cancelled
//! ```
//!
//! A session only touches the store in `apply`. Committed and Cancelled
//! sessions are finished: every further call fails with `NoActiveSession`.

use serde::{Deserialize, Serialize};

use crate::column::ValueKind;
use crate::error::{GridError, Result};
use crate::store::CellStore;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditState {
    Editing,
    Validating,
    Committing,
    Committed,
    Cancelled,
}

impl EditState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EditState::Committed | EditState::Cancelled)
    }
}

/// Keyboard input while a cell editor is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Append a character to the draft text.
    Char(char),
    /// Delete the last character of the draft text.
    Backspace,
    /// Empty the draft.
    Clear,
    /// Commit.
    Enter,
    /// Cancel.
    Escape,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    row: usize,
    col: usize,
    kind: ValueKind,
    original: Value,
    draft: Value,
    /// Coerced draft, set while `Validating`.
    pending: Option<Value>,
    state: EditState,
    error: Option<GridError>,
}

impl EditSession {
    /// Open an editor on (row, col), snapshotting the current value.
    pub fn begin(store: &CellStore, row: usize, col: usize) -> Result<Self> {
        store.check_bounds(row, col)?;
        let column = store.column(col).ok_or(GridError::OutOfBounds {
            row,
            col,
            rows: store.rows(),
            cols: store.cols(),
        })?;
        if !column.is_editable() {
            return Err(GridError::NotEditable { col });
        }

        let original = store.value(row, col)?.clone();
        log::debug!("edit ({row}, {col}) begin, original {original:?}");
        Ok(Self {
            row,
            col,
            kind: column.kind,
            draft: original.clone(),
            original,
            pending: None,
            state: EditState::Editing,
            error: None,
        })
    }

    pub fn cell(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn original(&self) -> &Value {
        &self.original
    }

    pub fn draft(&self) -> &Value {
        &self.draft
    }

    /// Draft as editor text. `Null` is the empty string.
    pub fn draft_text(&self) -> String {
        self.draft.display()
    }

    /// Error from the last failed validation, if the draft was not changed since.
    pub fn error(&self) -> Option<&GridError> {
        self.error.as_ref()
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    fn require(&self, expected: EditState, action: &'static str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(GridError::NoActiveSession);
        }
        if self.state != expected {
            return Err(GridError::InvalidTransition { state: self.state, action });
        }
        Ok(())
    }

    fn transition(&mut self, to: EditState) {
        log::trace!("edit ({}, {}) {:?} -> {:?}", self.row, self.col, self.state, to);
        self.state = to;
    }

    pub fn update_draft(&mut self, value: Value) -> Result<()> {
        self.require(EditState::Editing, "update draft")?;
        self.draft = value;
        self.error = None;
        Ok(())
    }

    /// Apply a key. Enter commits into `store`, Escape cancels; other keys
    /// edit the draft text.
    pub fn apply_key(&mut self, store: &mut CellStore, key: EditKey) -> Result<()> {
        match key {
            EditKey::Enter => self.commit(store).map(|_| ()),
            EditKey::Escape => self.cancel(),
            EditKey::Char(ch) => {
                let mut text = self.draft_text();
                text.push(ch);
                self.update_draft(Value::Text(text))
            }
            EditKey::Backspace => {
                let mut text = self.draft_text();
                text.pop();
                self.update_draft(Value::Text(text))
            }
            EditKey::Clear => self.update_draft(Value::Null),
        }
    }

    /// Coerce the draft by column kind. On failure the session returns to
    /// `Editing` with the error attached and the draft untouched.
    pub fn validate(&mut self) -> Result<Value> {
        self.require(EditState::Editing, "validate")?;
        self.transition(EditState::Validating);

        match self.kind.coerce(&self.draft) {
            Ok(value) => {
                self.error = None;
                self.pending = Some(value.clone());
                Ok(value)
            }
            Err(reason) => {
                let err = GridError::InvalidValue { row: self.row, col: self.col, kind: self.kind, reason };
                self.error = Some(err.clone());
                self.transition(EditState::Editing);
                Err(err)
            }
        }
    }

    /// Write the validated value. Returns the value it replaced.
    pub fn apply(&mut self, store: &mut CellStore) -> Result<Value> {
        self.require(EditState::Validating, "apply")?;
        let Some(value) = self.pending.take() else {
            return Err(GridError::InvalidTransition { state: self.state, action: "apply" });
        };

        self.transition(EditState::Committing);
        match store.set(self.row, self.col, value) {
            Ok(previous) => {
                self.transition(EditState::Committed);
                log::debug!("edit ({}, {}) committed", self.row, self.col);
                Ok(previous)
            }
            Err(err) => {
                self.error = Some(err.clone());
                self.transition(EditState::Editing);
                Err(err)
            }
        }
    }

    /// `validate` then `apply`.
    pub fn commit(&mut self, store: &mut CellStore) -> Result<Value> {
        self.validate()?;
        self.apply(store)
    }

    pub fn cancel(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(GridError::NoActiveSession);
        }
        if self.state == EditState::Committing {
            return Err(GridError::InvalidTransition { state: self.state, action: "cancel" });
        }
        self.pending = None;
        self.transition(EditState::Cancelled);
        log::debug!("edit ({}, {}) cancelled", self.row, self.col);
        Ok(())
    }
}
