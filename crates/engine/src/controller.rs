//! The grid controller: owns the store, the edit session and the viewport,
//! and turns renderer input into model changes.
//!
//! Rendering is delegated to a [`Renderer`]; the controller hands it a
//! [`DisplayModel`] built purely from current state.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::column::{Alignment, Column, DEFAULT_COLUMN_WIDTH, MIN_FLEX_COLUMN_WIDTH};
use crate::edit::{EditKey, EditSession, EditState};
use crate::error::{GridError, Result};
use crate::events::{StoreCallback, StoreEvent};
use crate::store::CellStore;
use crate::style::{tags, Mode, ResolvedStyle, StyleResolver};
use crate::value::Value;
use crate::viewport::{
    distribute_flexible, Rect, ScrollbarState, Size, ViewportComputer, ViewportState, VisibleWindow,
};

/// Layout and appearance options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub row_height: f32,
    pub column_gap: f32,
    /// Width given to columns added by `resize`.
    pub default_column_width: f32,
    pub min_flex_width: f32,
    pub mode: Mode,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_height: 1.0,
            column_gap: 1.0,
            default_column_width: DEFAULT_COLUMN_WIDTH,
            min_flex_width: MIN_FLEX_COLUMN_WIDTH,
            mode: Mode::Dark,
        }
    }
}

/// What activating a cell did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// An edit session is open on the cell.
    Editing,
    /// The cell is read-only; it was only selected.
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

/// Cells that scrolled into or out of view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewportChange {
    pub entered: Vec<(usize, usize)>,
    pub left: Vec<(usize, usize)>,
}

impl ViewportChange {
    fn between(before: &VisibleWindow, after: &VisibleWindow) -> Self {
        let old: FxHashSet<(usize, usize)> = before.cells().into_iter().collect();
        let new: FxHashSet<(usize, usize)> = after.cells().into_iter().collect();
        let mut entered: Vec<_> = new.difference(&old).copied().collect();
        let mut left: Vec<_> = old.difference(&new).copied().collect();
        entered.sort_unstable();
        left.sort_unstable();
        Self { entered, left }
    }

    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// Cells needing a redraw since the last `take_damage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Damage {
    Clean,
    /// Visible cells only, row-major.
    Cells(Vec<(usize, usize)>),
    Full,
}

#[derive(Debug, Default)]
struct DamageTracker {
    cells: FxHashSet<(usize, usize)>,
    rows: FxHashSet<usize>,
    cols: FxHashSet<usize>,
    full: bool,
}

impl DamageTracker {
    fn record(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::CellChanged(change) => {
                self.cells.insert((change.row, change.col));
            }
            StoreEvent::CellsSaved { cells } => self.cells.extend(cells.iter().copied()),
            StoreEvent::StyleChanged { row, col: Some(col) } => {
                self.cells.insert((*row, *col));
            }
            StoreEvent::StyleChanged { row, col: None } => {
                self.rows.insert(*row);
            }
            StoreEvent::Restructured { .. } => self.full = true,
        }
    }

    fn is_clean(&self) -> bool {
        !self.full && self.cells.is_empty() && self.rows.is_empty() && self.cols.is_empty()
    }
}

/// One visible cell, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub style: ResolvedStyle,
    pub rect: Rect,
    pub alignment: Alignment,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub col: usize,
    pub label: String,
    pub style: ResolvedStyle,
    /// `y` and `height` are zero; the renderer owns the header band.
    pub rect: Rect,
    pub alignment: Alignment,
}

/// The open cell editor, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub state: EditState,
    /// Message of the last failed validation.
    pub error: Option<String>,
    /// `None` when the edited cell is scrolled out of view.
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub cells: Vec<DisplayCell>,
    pub headers: Vec<HeaderCell>,
    pub scrollbars: ScrollbarState,
    pub editor: Option<EditorState>,
    pub viewport: ViewportState,
    pub cursor: Option<(usize, usize)>,
    pub mode: Mode,
}

/// Input a renderer reports back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Scroll by whole columns (`dx`) and rows (`dy`).
    Scroll { dx: i64, dy: i64 },
    Resize { width: f32, height: f32 },
    Activate { row: usize, col: usize },
    /// Activate the cell under the cursor.
    ActivateCursor,
    Key(EditKey),
    Commit,
    Cancel,
    Navigate(Navigation),
    ResizeColumn { col: usize, width: f32 },
    ToggleMode,
}

/// Result of `dispatch`, mirroring the handler that ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Viewport(ViewportChange),
    Activated(Activation),
    Edit(EditState),
    Cursor(Option<(usize, usize)>),
    Layout,
    Mode(Mode),
    /// Nothing to act on (e.g. `ActivateCursor` on an empty grid).
    Ignored,
}

/// A drawing surface and input source.
pub trait Renderer {
    type Error;

    fn render(&mut self, model: &DisplayModel) -> std::result::Result<(), Self::Error>;

    /// Next input event, or `None` if nothing is pending.
    fn poll_event(&mut self) -> std::result::Result<Option<InputEvent>, Self::Error>;
}

pub struct GridController {
    store: CellStore,
    resolver: StyleResolver,
    viewport: ViewportComputer,
    options: GridOptions,
    session: Option<EditSession>,
    container: Size,
    scroll: (usize, usize),
    cursor: Option<(usize, usize)>,
    damage: Rc<RefCell<DamageTracker>>,
    seen_generation: u64,
}

impl std::fmt::Debug for GridController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridController")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("session", &self.session)
            .field("container", &self.container)
            .field("scroll", &self.scroll)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl GridController {
    pub fn new(columns: Vec<Column>, rows: usize, resolver: StyleResolver, options: GridOptions) -> Self {
        let mut store = CellStore::new(columns, rows);
        let damage = Rc::new(RefCell::new(DamageTracker { full: true, ..Default::default() }));
        let tracker = Rc::clone(&damage);
        store.subscribe(Box::new(move |event| tracker.borrow_mut().record(event)));

        let seen_generation = resolver.generation();
        let cursor = (rows > 0 && store.cols() > 0).then_some((0, 0));
        Self {
            store,
            resolver,
            viewport: ViewportComputer::new(options.column_gap),
            options,
            session: None,
            container: Size::default(),
            scroll: (0, 0),
            cursor,
            damage,
            seen_generation,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    /// Another handle on the controller's resolver; reloads through it are
    /// picked up on the next display model.
    pub fn resolver(&self) -> &StyleResolver {
        &self.resolver
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    pub fn scroll(&self) -> (usize, usize) {
        self.scroll
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn subscribe(&mut self, callback: StoreCallback) {
        self.store.subscribe(callback);
    }

    fn widths(&self) -> Vec<f32> {
        self.store.columns().iter().map(|c| c.width).collect()
    }

    pub fn visible_window(&self) -> VisibleWindow {
        self.viewport.compute_visible(
            self.container,
            self.options.row_height,
            &self.widths(),
            self.store.rows(),
            self.scroll.0 as i64,
            self.scroll.1 as i64,
        )
    }

    pub fn viewport_state(&self) -> ViewportState {
        self.visible_window().state()
    }

    // =========================================================================
    // Viewport events
    // =========================================================================

    /// Scroll by `dx` columns and `dy` rows.
    pub fn on_scroll(&mut self, dx: i64, dy: i64) -> ViewportChange {
        let before = self.visible_window();
        let row = (self.scroll.0 as i64).saturating_add(dy);
        let col = (self.scroll.1 as i64).saturating_add(dx);
        self.scroll = self.clamped_scroll(row, col);
        self.viewport_changed(before)
    }

    pub fn on_resize(&mut self, width: f32, height: f32) -> ViewportChange {
        let before = self.visible_window();
        self.container = Size::new(width.max(0.0), height.max(0.0));

        let (gap, min) = (self.options.column_gap, self.options.min_flex_width);
        if distribute_flexible(self.store.columns_mut(), self.container.width, gap, min) {
            log::trace!("flexible columns redistributed for width {width}");
        }

        self.scroll = self.clamped_scroll(self.scroll.0 as i64, self.scroll.1 as i64);
        if let Some(cursor) = self.cursor {
            self.scroll_to(cursor);
        }
        self.damage.borrow_mut().full = true;
        self.viewport_changed(before)
    }

    /// Largest useful scroll: the last page of rows stays filled.
    fn clamped_scroll(&self, row: i64, col: i64) -> (usize, usize) {
        let page = self.viewport.full_rows(self.container, self.options.row_height);
        let max_row = self.store.rows().saturating_sub(page) as i64;
        let max_col = self.store.cols().saturating_sub(1) as i64;
        (row.clamp(0, max_row) as usize, col.clamp(0, max_col) as usize)
    }

    fn viewport_changed(&mut self, before: VisibleWindow) -> ViewportChange {
        let after = self.visible_window();
        let change = ViewportChange::between(&before, &after);
        if !change.is_empty() {
            log::trace!(
                "viewport {:?}: {} entered, {} left",
                after.state(),
                change.entered.len(),
                change.left.len()
            );
            self.damage.borrow_mut().full = true;
        }
        change
    }

    fn scroll_to(&mut self, cursor: (usize, usize)) {
        self.scroll = self.viewport.ensure_visible(
            cursor,
            self.container,
            self.options.row_height,
            &self.widths(),
            self.scroll,
        );
    }

    // =========================================================================
    // Cursor and editing
    // =========================================================================

    fn move_cursor(&mut self, to: (usize, usize)) {
        let mut damage = self.damage.borrow_mut();
        for (row, col) in self.cursor.into_iter().chain(Some(to)) {
            damage.rows.insert(row);
            damage.cols.insert(col);
        }
        drop(damage);
        self.cursor = Some(to);
    }

    /// Click or Enter on a cell: open an editor if the column allows it.
    pub fn on_cell_activate(&mut self, row: usize, col: usize) -> Result<Activation> {
        self.store.check_bounds(row, col)?;
        if let Some(session) = &self.session {
            if session.cell() == (row, col) {
                return Ok(Activation::Editing);
            }
            let (row, col) = session.cell();
            return Err(GridError::EditInProgress { row, col });
        }

        self.move_cursor((row, col));
        self.scroll_to((row, col));

        match EditSession::begin(&self.store, row, col) {
            Ok(session) => {
                self.session = Some(session);
                self.damage.borrow_mut().cells.insert((row, col));
                Ok(Activation::Editing)
            }
            Err(GridError::NotEditable { .. }) => Ok(Activation::Highlight),
            Err(e) => Err(e),
        }
    }

    fn active_session(&mut self) -> Result<&mut EditSession> {
        self.session.as_mut().ok_or(GridError::NoActiveSession)
    }

    /// Drop the session once it reaches a terminal state.
    fn settle_session(&mut self) -> EditState {
        let Some(session) = &self.session else {
            return EditState::Cancelled;
        };
        let state = session.state();
        self.damage.borrow_mut().cells.insert(session.cell());
        if state.is_terminal() {
            self.session = None;
        }
        state
    }

    pub fn on_key_input(&mut self, key: EditKey) -> Result<EditState> {
        let session = self.session.as_mut().ok_or(GridError::NoActiveSession)?;
        let result = session.apply_key(&mut self.store, key);
        let state = self.settle_session();
        result.map(|_| state)
    }

    /// Commit the open editor. Returns the value it replaced.
    pub fn on_commit_request(&mut self) -> Result<Value> {
        let session = self.session.as_mut().ok_or(GridError::NoActiveSession)?;
        let result = session.commit(&mut self.store);
        self.settle_session();
        result
    }

    pub fn on_cancel_request(&mut self) -> Result<()> {
        self.active_session()?.cancel()?;
        self.settle_session();
        Ok(())
    }

    /// Move the cursor and scroll it into view. Not allowed while editing.
    pub fn on_navigate(&mut self, nav: Navigation) -> Result<Option<(usize, usize)>> {
        if let Some(session) = &self.session {
            let (row, col) = session.cell();
            return Err(GridError::EditInProgress { row, col });
        }
        let (rows, cols) = (self.store.rows(), self.store.cols());
        if rows == 0 || cols == 0 {
            return Ok(None);
        }

        let (row, col) = self.cursor.unwrap_or((0, 0));
        let page = self
            .viewport
            .full_rows(self.container, self.options.row_height)
            .saturating_sub(1)
            .max(1);
        let to = match nav {
            Navigation::Up => (row.saturating_sub(1), col),
            Navigation::Down => ((row + 1).min(rows - 1), col),
            Navigation::Left => (row, col.saturating_sub(1)),
            Navigation::Right => (row, (col + 1).min(cols - 1)),
            Navigation::PageUp => (row.saturating_sub(page), col),
            Navigation::PageDown => ((row + page).min(rows - 1), col),
            Navigation::Home => (0, col),
            Navigation::End => (rows - 1, col),
        };

        let before = self.visible_window();
        self.move_cursor(to);
        self.scroll_to(to);
        self.viewport_changed(before);
        Ok(Some(to))
    }

    // =========================================================================
    // Data operations
    // =========================================================================

    pub fn set_cell_value(&mut self, row: usize, col: usize, value: Value) -> Result<Value> {
        self.store.set(row, col, value)
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Result<Cell> {
        self.store.get(row, col)
    }

    pub fn load_rows(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        crate::trace::timed("grid.load_rows", || self.store.load_rows(rows))?;
        self.restructured();
        Ok(())
    }

    pub fn export_dirty_cells(&self) -> Vec<Cell> {
        self.store.dirty_cells()
    }

    /// Dirty cells as a JSON array.
    pub fn export_dirty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.store.dirty_cells())
    }

    pub fn mark_saved(&mut self, row: usize, col: usize) -> Result<()> {
        self.store.mark_saved(row, col)
    }

    pub fn mark_all_saved(&mut self) {
        self.store.mark_all_saved();
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        let old_cols = self.store.cols();
        self.store.resize(rows, cols);
        for col in old_cols..cols {
            if let Err(e) = self.store.set_column_width(col, self.options.default_column_width) {
                log::warn!("column {col}: {e}");
            }
        }
        self.restructured();
    }

    pub fn insert_row(&mut self, at: usize) -> Result<()> {
        self.store.insert_row(at)?;
        self.restructured();
        Ok(())
    }

    pub fn remove_row(&mut self, at: usize) -> Result<()> {
        self.store.remove_row(at)?;
        self.restructured();
        Ok(())
    }

    pub fn set_cell_style(&mut self, row: usize, col: usize, tag: Option<String>) -> Result<()> {
        self.store.set_cell_style(row, col, tag)
    }

    pub fn set_row_style(&mut self, row: usize, tag: Option<String>) -> Result<()> {
        self.store.set_row_style(row, tag)
    }

    pub fn resize_column(&mut self, col: usize, width: f32) -> Result<()> {
        self.store.set_column_width(col, width)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.options.mode != mode {
            log::debug!("mode -> {mode:?}");
            self.options.mode = mode;
            self.damage.borrow_mut().full = true;
        }
    }

    /// After a structural change: drop the editor, keep cursor and scroll in range.
    fn restructured(&mut self) {
        if let Some(session) = self.session.take() {
            let (row, col) = session.cell();
            log::debug!("edit ({row}, {col}) dropped by structural change");
        }
        let (rows, cols) = (self.store.rows(), self.store.cols());
        self.cursor = match self.cursor {
            _ if rows == 0 || cols == 0 => None,
            Some((r, c)) => Some((r.min(rows - 1), c.min(cols - 1))),
            None => Some((0, 0)),
        };
        self.scroll = self.clamped_scroll(self.scroll.0 as i64, self.scroll.1 as i64);
    }

    // =========================================================================
    // Display
    // =========================================================================

    /// Cells whose display may have changed since the previous call.
    pub fn take_damage(&mut self) -> Damage {
        let generation = self.resolver.generation();
        let mut tracker = self.damage.borrow_mut();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            tracker.full = true;
        }
        if tracker.is_clean() {
            return Damage::Clean;
        }
        let tracker = std::mem::take(&mut *tracker);
        if tracker.full {
            return Damage::Full;
        }

        let window = self.visible_window();
        let mut cells: Vec<(usize, usize)> = window
            .cells()
            .into_iter()
            .filter(|(row, col)| {
                tracker.cells.contains(&(*row, *col))
                    || tracker.rows.contains(row)
                    || tracker.cols.contains(col)
            })
            .collect();
        cells.sort_unstable();
        if cells.is_empty() {
            Damage::Clean
        } else {
            Damage::Cells(cells)
        }
    }

    fn cell_tags<'a>(&'a self, row: usize, col: usize, cell: &'a Cell) -> Vec<&'a str> {
        let mut layers = vec![tags::CELL];
        if let Some(tag) = self.store.row_style(row) {
            layers.push(tag);
        }
        if let Some(tag) = cell.style_tag.as_deref() {
            layers.push(tag);
        }
        if let Some((cr, cc)) = self.cursor {
            if cr == row {
                layers.push(tags::SELECTED_ROW);
            }
            if cc == col {
                layers.push(tags::SELECTED_COLUMN);
            }
            if (cr, cc) == (row, col) {
                layers.push(tags::SELECTED_CELL);
            }
        }
        if cell.dirty {
            layers.push(tags::DIRTY);
        }
        if let Some(session) = self.session.as_ref().filter(|s| s.cell() == (row, col)) {
            layers.push(tags::EDITING);
            if session.error().is_some() {
                layers.push(tags::INVALID);
            }
        }
        layers
    }

    /// Snapshot of everything a renderer needs. Pure.
    pub fn display_model(&self) -> DisplayModel {
        let mode = self.options.mode;
        let widths = self.widths();
        let window = self.visible_window();
        let row_height = self.options.row_height;

        let mut cells = Vec::new();
        let mut headers = Vec::new();
        let mut editor_rect = None;

        if let Some(range) = window.range() {
            for col in range.cols() {
                let column = &self.store.columns()[col];
                let selected = self.cursor.is_some_and(|(_, c)| c == col);
                let layers: &[&str] = if selected {
                    &[tags::HEADER, tags::SELECTED_HEADER]
                } else {
                    &[tags::HEADER]
                };
                let rect = self.viewport.cell_rect(range, range.first_row, col, row_height, &widths);
                headers.push(HeaderCell {
                    col,
                    label: column.label.clone(),
                    style: self.resolver.resolve_layers(layers, mode),
                    rect: Rect { y: 0.0, height: 0.0, ..rect },
                    alignment: column.alignment,
                });
            }

            for (row, col) in window.cells() {
                let Ok(cell) = self.store.get(row, col) else {
                    continue;
                };
                let rect = self.viewport.cell_rect(range, row, col, row_height, &widths);
                let editing = self.session.as_ref().filter(|s| s.cell() == (row, col));
                if editing.is_some() {
                    editor_rect = Some(rect);
                }
                let text = match editing {
                    Some(session) => session.draft_text(),
                    None => cell.value.display(),
                };
                let style = self.resolver.resolve_layers(&self.cell_tags(row, col, &cell), mode);
                cells.push(DisplayCell {
                    row,
                    col,
                    text,
                    style,
                    rect,
                    alignment: self.store.columns()[col].alignment,
                    dirty: cell.dirty,
                });
            }
        }

        let editor = self.session.as_ref().map(|session| {
            let (row, col) = session.cell();
            EditorState {
                row,
                col,
                text: session.draft_text(),
                state: session.state(),
                error: session.error().map(ToString::to_string),
                rect: editor_rect,
            }
        });

        DisplayModel {
            cells,
            headers,
            scrollbars: self.viewport.scrollbars(
                self.container,
                row_height,
                &widths,
                self.store.rows(),
                self.scroll.0 as i64,
                self.scroll.1 as i64,
            ),
            editor,
            viewport: window.state(),
            cursor: self.cursor,
            mode,
        }
    }

    pub fn render<R: Renderer>(&self, renderer: &mut R) -> std::result::Result<(), R::Error> {
        let model = crate::trace::timed("grid.display_model", || self.display_model());
        renderer.render(&model)
    }

    /// Route one renderer event to its handler.
    pub fn dispatch(&mut self, event: InputEvent) -> Result<Response> {
        Ok(match event {
            InputEvent::Scroll { dx, dy } => Response::Viewport(self.on_scroll(dx, dy)),
            InputEvent::Resize { width, height } => Response::Viewport(self.on_resize(width, height)),
            InputEvent::Activate { row, col } => Response::Activated(self.on_cell_activate(row, col)?),
            InputEvent::ActivateCursor => match self.cursor {
                Some((row, col)) => Response::Activated(self.on_cell_activate(row, col)?),
                None => Response::Ignored,
            },
            InputEvent::Key(key) => Response::Edit(self.on_key_input(key)?),
            InputEvent::Commit => {
                self.on_commit_request()?;
                Response::Edit(EditState::Committed)
            }
            InputEvent::Cancel => {
                self.on_cancel_request()?;
                Response::Edit(EditState::Cancelled)
            }
            InputEvent::Navigate(nav) => Response::Cursor(self.on_navigate(nav)?),
            InputEvent::ResizeColumn { col, width } => {
                self.resize_column(col, width)?;
                Response::Layout
            }
            InputEvent::ToggleMode => {
                self.set_mode(self.options.mode.toggled());
                Response::Mode(self.options.mode)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ValueKind;

    fn grid() -> GridController {
        let columns = vec![
            Column::text("Name").with_width(10.0),
            Column::number("Qty").with_width(6.0),
            Column::readonly("Id").with_width(4.0),
        ];
        let mut grid = GridController::new(columns, 5, StyleResolver::new(), GridOptions::default());
        grid.load_rows(
            (0..5)
                .map(|i| vec![Value::text(format!("item{i}")), Value::from(i), Value::from(100 + i)])
                .collect(),
        )
        .unwrap();
        grid.on_resize(40.0, 3.0);
        grid
    }

    #[test]
    fn test_edit_invalid_then_commit() {
        let mut grid = grid();
        assert_eq!(grid.on_cell_activate(2, 1).unwrap(), Activation::Editing);

        grid.on_key_input(EditKey::Clear).unwrap();
        for ch in "abc".chars() {
            grid.on_key_input(EditKey::Char(ch)).unwrap();
        }
        let err = grid.on_commit_request().unwrap_err();
        assert!(matches!(err, GridError::InvalidValue { kind: ValueKind::Number, .. }));
        assert_eq!(grid.session().map(EditSession::state), Some(EditState::Editing));

        grid.on_key_input(EditKey::Clear).unwrap();
        grid.on_key_input(EditKey::Char('4')).unwrap();
        grid.on_key_input(EditKey::Char('2')).unwrap();
        assert_eq!(grid.on_key_input(EditKey::Enter).unwrap(), EditState::Committed);
        assert!(grid.session().is_none());

        let cell = grid.get_cell(2, 1).unwrap();
        assert_eq!(cell.value, Value::from(42));
        assert!(cell.dirty);
    }

    #[test]
    fn test_readonly_activation_highlights() {
        let mut grid = grid();
        assert_eq!(grid.on_cell_activate(1, 2).unwrap(), Activation::Highlight);
        assert!(grid.session().is_none());
        assert_eq!(grid.cursor(), Some((1, 2)));
    }

    #[test]
    fn test_single_session() {
        let mut grid = grid();
        grid.on_cell_activate(0, 0).unwrap();
        assert_eq!(grid.on_cell_activate(0, 0).unwrap(), Activation::Editing);
        assert_eq!(grid.on_cell_activate(1, 0), Err(GridError::EditInProgress { row: 0, col: 0 }));
        assert!(matches!(grid.on_navigate(Navigation::Down), Err(GridError::EditInProgress { .. })));

        grid.on_cancel_request().unwrap();
        assert_eq!(grid.on_cancel_request(), Err(GridError::NoActiveSession));
        assert_eq!(grid.on_commit_request(), Err(GridError::NoActiveSession));
        assert_eq!(grid.on_key_input(EditKey::Char('x')), Err(GridError::NoActiveSession));
        assert_eq!(grid.on_cell_activate(1, 0).unwrap(), Activation::Editing);
    }

    #[test]
    fn test_out_of_bounds_activation() {
        let mut grid = grid();
        assert!(matches!(grid.on_cell_activate(5, 0), Err(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn test_structural_change_drops_session() {
        let mut grid = grid();
        grid.on_cell_activate(4, 0).unwrap();
        grid.remove_row(0).unwrap();
        assert!(grid.session().is_none());
        assert_eq!(grid.cursor(), Some((3, 0)));
        assert_eq!(grid.store().rows(), 4);
    }

    #[test]
    fn test_navigation_pages_by_visible_rows() {
        let mut grid = grid();
        grid.resize(20, 3);
        grid.on_resize(40.0, 5.0);
        assert_eq!(grid.cursor(), Some((0, 0)));

        assert_eq!(grid.on_navigate(Navigation::PageDown).unwrap(), Some((4, 0)));
        assert_eq!(grid.on_navigate(Navigation::PageDown).unwrap(), Some((8, 0)));
        assert_eq!(grid.scroll().0, 4);
        assert_eq!(grid.on_navigate(Navigation::PageUp).unwrap(), Some((4, 0)));
        assert_eq!(grid.on_navigate(Navigation::End).unwrap(), Some((19, 0)));
        assert_eq!(grid.scroll().0, 15);
        assert_eq!(grid.on_navigate(Navigation::Down).unwrap(), Some((19, 0)));
        assert_eq!(grid.on_navigate(Navigation::Home).unwrap(), Some((0, 0)));
        assert_eq!(grid.scroll().0, 0);
        assert_eq!(grid.on_navigate(Navigation::Left).unwrap(), Some((0, 0)));
        assert_eq!(grid.on_navigate(Navigation::Right).unwrap(), Some((0, 1)));
    }

    #[test]
    fn test_scroll_reports_entered_and_left() {
        let mut grid = grid();
        grid.resize(10, 3);
        grid.on_resize(40.0, 2.0);

        let change = grid.on_scroll(0, 1);
        assert_eq!(grid.scroll(), (1, 0));
        assert_eq!(change.left, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(change.entered, vec![(2, 0), (2, 1), (2, 2)]);

        let change = grid.on_scroll(0, -10);
        assert_eq!(grid.scroll(), (0, 0));
        assert_eq!(change.entered.len(), 3);

        grid.on_scroll(0, 100);
        assert_eq!(grid.scroll().0, 8);
    }

    #[test]
    fn test_resize_uses_default_column_width() {
        let options = GridOptions { default_column_width: 7.0, ..GridOptions::default() };
        let mut grid = GridController::new(vec![Column::text("Name").with_width(10.0)], 2, StyleResolver::new(), options);
        grid.resize(2, 3);
        let widths: Vec<f32> = grid.store().columns().iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![10.0, 7.0, 7.0]);
    }

    #[test]
    fn test_scroll_extreme_deltas_clamp() {
        let mut grid = grid();
        grid.resize(50, 3);
        grid.on_resize(40.0, 2.0);

        grid.on_scroll(0, 3);
        grid.on_scroll(0, i64::MAX);
        assert_eq!(grid.scroll(), (48, 0));

        grid.on_scroll(i64::MAX, 0);
        assert_eq!(grid.scroll(), (48, 2));

        grid.on_scroll(i64::MIN, i64::MIN);
        assert_eq!(grid.scroll(), (0, 0));
    }

    #[test]
    fn test_display_model_layers_styles() {
        let mut grid = grid();
        grid.resolver()
            .load_document(
                "warn { color: orange }\nselected-cell { background: blue }\ndirty { bold: true }\nheader { bold: true }",
            )
            .unwrap();
        grid.set_row_style(1, Some("warn".into())).unwrap();
        grid.set_cell_value(1, 0, Value::text("changed")).unwrap();

        let model = grid.display_model();
        let cell = model.cells.iter().find(|c| (c.row, c.col) == (1, 0)).unwrap();
        assert_eq!(cell.text, "changed");
        assert_eq!(cell.style.color(), Some("orange"));
        assert!(cell.style.flag("bold"));
        assert!(cell.dirty);

        let origin = model.cells.iter().find(|c| (c.row, c.col) == (0, 0)).unwrap();
        assert_eq!(origin.style.background(), Some("blue"));
        assert!(!origin.style.flag("bold"));

        assert_eq!(model.headers.len(), 3);
        assert_eq!(model.headers[1].label, "Qty");
        assert!(model.headers[1].style.flag("bold"));
        assert_eq!(model.headers[1].alignment, Alignment::Right);
        assert!(model.editor.is_none());
    }

    #[test]
    fn test_display_model_shows_draft() {
        let mut grid = grid();
        grid.on_cell_activate(0, 0).unwrap();
        grid.on_key_input(EditKey::Char('!')).unwrap();
        let model = grid.display_model();
        let editor = model.editor.unwrap();
        assert_eq!(editor.text, "item0!");
        assert!(editor.rect.is_some());
        assert_eq!(model.cells[0].text, "item0!");
        assert_eq!(grid.get_cell(0, 0).unwrap().value, Value::text("item0"));
    }

    #[test]
    fn test_damage_tracking() {
        let mut grid = grid();
        assert_eq!(grid.take_damage(), Damage::Full);
        assert_eq!(grid.take_damage(), Damage::Clean);

        grid.set_cell_value(1, 1, Value::from(9)).unwrap();
        assert_eq!(grid.take_damage(), Damage::Cells(vec![(1, 1)]));

        grid.resolver().load_document("cell { color: red }").unwrap();
        assert_eq!(grid.take_damage(), Damage::Full);

        grid.set_mode(Mode::Light);
        assert_eq!(grid.take_damage(), Damage::Full);
        grid.set_mode(Mode::Light);
        assert_eq!(grid.take_damage(), Damage::Clean);
    }

    #[test]
    fn test_export_dirty_json() {
        let mut grid = grid();
        grid.set_cell_value(3, 0, Value::text("x")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&grid.export_dirty_json().unwrap()).unwrap();
        assert_eq!(json[0]["row"], 3);
        assert_eq!(json[0]["value"], "x");
        assert_eq!(json[0]["dirty"], true);

        grid.mark_all_saved();
        assert!(grid.export_dirty_cells().is_empty());
    }

    #[test]
    fn test_dispatch_routes_events() {
        let mut grid = grid();
        assert_eq!(
            grid.dispatch(InputEvent::Navigate(Navigation::Right)).unwrap(),
            Response::Cursor(Some((0, 1)))
        );
        assert_eq!(grid.dispatch(InputEvent::ActivateCursor).unwrap(), Response::Activated(Activation::Editing));
        assert_eq!(grid.dispatch(InputEvent::Key(EditKey::Char('7'))).unwrap(), Response::Edit(EditState::Editing));
        assert_eq!(grid.dispatch(InputEvent::Cancel).unwrap(), Response::Edit(EditState::Cancelled));
        assert_eq!(grid.dispatch(InputEvent::ToggleMode).unwrap(), Response::Mode(Mode::Light));
        assert_eq!(
            grid.dispatch(InputEvent::ResizeColumn { col: 0, width: 0.0 }).unwrap(),
            Response::Layout
        );
        assert_eq!(grid.store().columns()[0].width, crate::column::MIN_COLUMN_WIDTH);
    }

    #[test]
    fn test_flexible_columns_follow_container() {
        let columns = vec![Column::text("a").with_width(10.0), Column::text("b").flexible()];
        let mut grid = GridController::new(columns, 1, StyleResolver::new(), GridOptions::default());
        grid.on_resize(41.0, 5.0);
        assert_eq!(grid.store().columns()[1].width, 30.0);
        grid.on_resize(8.0, 5.0);
        assert_eq!(grid.store().columns()[1].width, MIN_FLEX_COLUMN_WIDTH);
    }

    struct Recorder {
        frames: usize,
        events: Vec<InputEvent>,
    }

    impl Renderer for Recorder {
        type Error = std::convert::Infallible;

        fn render(&mut self, _model: &DisplayModel) -> std::result::Result<(), Self::Error> {
            self.frames += 1;
            Ok(())
        }

        fn poll_event(&mut self) -> std::result::Result<Option<InputEvent>, Self::Error> {
            Ok(self.events.pop())
        }
    }

    #[test]
    fn test_render_loop() {
        let mut grid = grid();
        let mut renderer = Recorder { frames: 0, events: vec![InputEvent::Scroll { dx: 1, dy: 0 }] };
        while let Ok(Some(event)) = renderer.poll_event() {
            grid.dispatch(event).unwrap();
            grid.render(&mut renderer).unwrap();
        }
        assert_eq!(renderer.frames, 1);
        assert_eq!(grid.scroll(), (0, 1));
    }
}
