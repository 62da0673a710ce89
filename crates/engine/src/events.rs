//! Change notifications emitted by the cell store.
//!
//! The controller subscribes to these to know which cells need a redraw;
//! hosts may subscribe too (e.g. to enable a "Save" button when something
//! becomes dirty).

/// Events emitted by `CellStore` after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A cell value changed via `set` (edit commit or `setCellValue`).
    CellChanged(CellChangedEvent),

    /// Dirty flags were cleared by the caller.
    CellsSaved { cells: Vec<(usize, usize)> },

    /// A cell or row style tag changed.
    /// `col == None` means the whole row.
    StyleChanged { row: usize, col: Option<usize> },

    /// Contents or extent changed wholesale (load, resize, row insert/remove).
    /// Every visible cell should be considered damaged.
    Restructured { rows: usize, cols: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellChangedEvent {
    pub row: usize,
    pub col: usize,
    /// Dirty state after the change.
    pub dirty: bool,
}

/// Callback type for receiving store events.
///
/// Not `Send`: the engine is driven from the UI thread only.
pub type StoreCallback = Box<dyn FnMut(&StoreEvent)>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<StoreEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: StoreEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[StoreEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only CellChanged events.
    pub fn cells_changed(&self) -> Vec<&CellChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                StoreEvent::CellChanged(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Count of Restructured events.
    pub fn restructured(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, StoreEvent::Restructured { .. }))
            .count()
    }
}
