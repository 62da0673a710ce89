//! Cell storage: values, saved baselines, style tags and change notification.
//!
//! Storage is sparse; a position without a slot is an empty, clean,
//! unstyled cell. The store never persists anything. It only remembers the
//! value the caller last acknowledged as saved so it can answer "is this
//! cell dirty?".

use std::fmt;

use rustc_hash::FxHashMap;

use crate::cell::{Cell, Slot};
use crate::column::{column_letters, sanitize_width, Column};
use crate::error::{GridError, Result};
use crate::events::{CellChangedEvent, StoreCallback, StoreEvent};
use crate::value::Value;

pub struct CellStore {
    columns: Vec<Column>,
    rows: usize,
    slots: FxHashMap<(usize, usize), Slot>,
    row_styles: FxHashMap<usize, String>,
    subscribers: Vec<StoreCallback>,
}

impl fmt::Debug for CellStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellStore")
            .field("rows", &self.rows)
            .field("cols", &self.columns.len())
            .field("slots", &self.slots.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl CellStore {
    pub fn new(columns: Vec<Column>, rows: usize) -> Self {
        let columns = columns
            .into_iter()
            .map(|mut c| {
                c.width = sanitize_width(c.width);
                c
            })
            .collect();
        Self {
            columns,
            rows,
            slots: FxHashMap::default(),
            row_styles: FxHashMap::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    /// Register a callback invoked after every mutation.
    pub fn subscribe(&mut self, callback: StoreCallback) {
        self.subscribers.push(callback);
    }

    fn notify(&mut self, event: StoreEvent) {
        for callback in self.subscribers.iter_mut() {
            callback(&event);
        }
    }

    pub(crate) fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows || col >= self.columns.len() {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.columns.len(),
            });
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(GridError::OutOfBounds { row, col: 0, rows: self.rows, cols: self.columns.len() });
        }
        Ok(())
    }

    // =========================================================================
    // Cell access
    // =========================================================================

    pub fn get(&self, row: usize, col: usize) -> Result<Cell> {
        self.check_bounds(row, col)?;
        Ok(match self.slots.get(&(row, col)) {
            Some(slot) => slot.to_cell(row, col),
            None => Slot::default().to_cell(row, col),
        })
    }

    /// Borrow just the value. Empty positions read as `Null`.
    pub fn value(&self, row: usize, col: usize) -> Result<&Value> {
        self.check_bounds(row, col)?;
        static NULL: Value = Value::Null;
        Ok(self.slots.get(&(row, col)).map(|s| &s.value).unwrap_or(&NULL))
    }

    pub fn is_dirty(&self, row: usize, col: usize) -> bool {
        self.slots.get(&(row, col)).is_some_and(Slot::is_dirty)
    }

    pub fn row_style(&self, row: usize) -> Option<&str> {
        self.row_styles.get(&row).map(String::as_str)
    }

    /// Store `value` after checking it against the column kind.
    /// Returns the previous value.
    pub fn set(&mut self, row: usize, col: usize, value: Value) -> Result<Value> {
        self.check_bounds(row, col)?;
        let kind = self.columns[col].kind;
        if !kind.accepts(&value) {
            return Err(GridError::InvalidValue {
                row,
                col,
                kind,
                reason: format!("'{}' does not fit a {} column", value.display(), kind),
            });
        }

        let slot = self.slots.entry((row, col)).or_default();
        let previous = std::mem::replace(&mut slot.value, value);
        let dirty = slot.is_dirty();
        if slot.is_vacant() {
            self.slots.remove(&(row, col));
        }

        self.notify(StoreEvent::CellChanged(CellChangedEvent { row, col, dirty }));
        Ok(previous)
    }

    pub fn set_cell_style(&mut self, row: usize, col: usize, tag: Option<String>) -> Result<()> {
        self.check_bounds(row, col)?;
        let slot = self.slots.entry((row, col)).or_default();
        slot.style_tag = tag;
        if slot.is_vacant() {
            self.slots.remove(&(row, col));
        }
        self.notify(StoreEvent::StyleChanged { row, col: Some(col) });
        Ok(())
    }

    pub fn set_row_style(&mut self, row: usize, tag: Option<String>) -> Result<()> {
        self.check_row(row)?;
        match tag {
            Some(tag) => self.row_styles.insert(row, tag),
            None => self.row_styles.remove(&row),
        };
        self.notify(StoreEvent::StyleChanged { row, col: None });
        Ok(())
    }

    pub fn set_column_width(&mut self, col: usize, width: f32) -> Result<()> {
        if col >= self.columns.len() {
            return Err(GridError::OutOfBounds { row: 0, col, rows: self.rows, cols: self.columns.len() });
        }
        self.columns[col].width = sanitize_width(width);
        let (rows, cols) = (self.rows, self.columns.len());
        self.notify(StoreEvent::Restructured { rows, cols });
        Ok(())
    }

    /// Mutable column access for layout (flexible widths). Not a data edit,
    /// so no event is emitted; the caller recomputes the viewport anyway.
    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    // =========================================================================
    // Saved baseline
    // =========================================================================

    pub fn mark_saved(&mut self, row: usize, col: usize) -> Result<()> {
        self.check_bounds(row, col)?;
        let mut cleared = false;
        if let Some(slot) = self.slots.get_mut(&(row, col)) {
            cleared = slot.is_dirty();
            slot.saved = slot.value.clone();
            if slot.is_vacant() {
                self.slots.remove(&(row, col));
            }
        }
        if cleared {
            self.notify(StoreEvent::CellsSaved { cells: vec![(row, col)] });
        }
        Ok(())
    }

    pub fn mark_all_saved(&mut self) {
        let mut cells: Vec<(usize, usize)> = Vec::new();
        for (pos, slot) in self.slots.iter_mut() {
            if slot.is_dirty() {
                slot.saved = slot.value.clone();
                cells.push(*pos);
            }
        }
        self.slots.retain(|_, slot| !slot.is_vacant());
        if !cells.is_empty() {
            cells.sort_unstable();
            self.notify(StoreEvent::CellsSaved { cells });
        }
    }

    /// Every dirty cell, row-major.
    pub fn dirty_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_dirty())
            .map(|(&(row, col), slot)| slot.to_cell(row, col))
            .collect();
        cells.sort_by_key(Cell::position);
        cells
    }

    pub fn dirty_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_dirty()).count()
    }

    // =========================================================================
    // Structural operations
    // =========================================================================

    /// Replace all contents. Every loaded value becomes the saved baseline.
    ///
    /// Short rows are padded with `Null`. Rows wider than the column list
    /// fail with `OutOfBounds`; any value that does not fit its column fails
    /// with `InvalidValue`. On failure nothing is changed.
    pub fn load_rows(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        let cols = self.columns.len();
        for (r, row) in rows.iter().enumerate() {
            if row.len() > cols {
                return Err(GridError::OutOfBounds { row: r, col: row.len() - 1, rows: rows.len(), cols });
            }
            for (c, value) in row.iter().enumerate() {
                let kind = self.columns[c].kind;
                if !kind.accepts(value) {
                    return Err(GridError::InvalidValue {
                        row: r,
                        col: c,
                        kind,
                        reason: format!("'{}' does not fit a {} column", value.display(), kind),
                    });
                }
            }
        }

        self.rows = rows.len();
        self.slots.clear();
        self.row_styles.clear();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                if value.is_null() {
                    continue;
                }
                self.slots.insert((r, c), Slot { value: value.clone(), saved: value, style_tag: None });
            }
        }

        log::debug!("loaded {} rows x {} cols", self.rows, cols);
        let rows = self.rows;
        self.notify(StoreEvent::Restructured { rows, cols });
        Ok(())
    }

    /// Grow or truncate the extent. Truncation drops out-of-range cells.
    /// New columns are text columns labelled with column letters.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if cols < self.columns.len() {
            self.columns.truncate(cols);
        }
        while self.columns.len() < cols {
            let label = column_letters(self.columns.len());
            self.columns.push(Column::text(label));
        }
        self.rows = rows;
        self.slots.retain(|&(r, c), _| r < rows && c < cols);
        self.row_styles.retain(|&r, _| r < rows);

        self.notify(StoreEvent::Restructured { rows, cols });
    }

    /// Insert an empty row at `at` (`at == rows` appends), shifting the rows below down.
    pub fn insert_row(&mut self, at: usize) -> Result<()> {
        if at > self.rows {
            return Err(GridError::OutOfBounds { row: at, col: 0, rows: self.rows, cols: self.columns.len() });
        }

        let shifted: Vec<_> = self.slots.keys().filter(|(r, _)| *r >= at).copied().collect();
        let mut moved = Vec::with_capacity(shifted.len());
        for pos in shifted {
            if let Some(slot) = self.slots.remove(&pos) {
                moved.push(((pos.0 + 1, pos.1), slot));
            }
        }
        self.slots.extend(moved);

        self.row_styles = std::mem::take(&mut self.row_styles)
            .into_iter()
            .map(|(r, tag)| (if r >= at { r + 1 } else { r }, tag))
            .collect();

        self.rows += 1;
        let (rows, cols) = (self.rows, self.columns.len());
        self.notify(StoreEvent::Restructured { rows, cols });
        Ok(())
    }

    /// Remove row `at`, shifting the rows below up.
    pub fn remove_row(&mut self, at: usize) -> Result<()> {
        self.check_row(at)?;

        self.slots.retain(|&(r, _), _| r != at);
        let shifted: Vec<_> = self.slots.keys().filter(|(r, _)| *r > at).copied().collect();
        let mut moved = Vec::with_capacity(shifted.len());
        for pos in shifted {
            if let Some(slot) = self.slots.remove(&pos) {
                moved.push(((pos.0 - 1, pos.1), slot));
            }
        }
        self.slots.extend(moved);

        self.row_styles.remove(&at);
        self.row_styles = std::mem::take(&mut self.row_styles)
            .into_iter()
            .map(|(r, tag)| (if r > at { r - 1 } else { r }, tag))
            .collect();

        self.rows -= 1;
        let (rows, cols) = (self.rows, self.columns.len());
        self.notify(StoreEvent::Restructured { rows, cols });
        Ok(())
    }
}
