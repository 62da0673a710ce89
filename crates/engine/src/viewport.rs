//! Scroll window computation.
//!
//! Everything here is a pure function of container size, row height,
//! column widths and scroll position. Units are whatever the renderer uses
//! (pixels for a GUI, character cells for a terminal).

use serde::{Deserialize, Serialize};

use crate::column::{sanitize_width, Column};

/// Row height used when a caller passes a non-positive one.
const MIN_ROW_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Position and extent of a drawn cell, relative to the container origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Inclusive index ranges of the rows and columns on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
    /// Content-space offset of `first_row`'s top edge.
    pub row_offset_px: f32,
    /// Content-space offset of `first_col`'s left edge.
    pub col_offset_px: f32,
}

impl VisibleRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first_row..=self.last_row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.first_col..=self.last_col
    }

    pub fn row_count(&self) -> usize {
        self.last_row - self.first_row + 1
    }

    pub fn col_count(&self) -> usize {
        self.last_col - self.first_col + 1
    }
}

/// Result of `compute_visible`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VisibleWindow {
    /// The grid has no rows or no columns.
    Empty,
    Range(VisibleRange),
}

impl VisibleWindow {
    pub fn range(&self) -> Option<&VisibleRange> {
        match self {
            VisibleWindow::Empty => None,
            VisibleWindow::Range(r) => Some(r),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, VisibleWindow::Empty)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.range().is_some_and(|r| r.contains(row, col))
    }

    /// Every visible (row, col), row-major.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let Some(range) = self.range() else {
            return Vec::new();
        };
        range.rows().flat_map(|row| range.cols().map(move |col| (row, col))).collect()
    }

    pub fn state(&self) -> ViewportState {
        match self {
            VisibleWindow::Empty => ViewportState::default(),
            VisibleWindow::Range(r) => ViewportState {
                scroll_row: r.first_row,
                scroll_col: r.first_col,
                visible_rows: r.row_count(),
                visible_cols: r.col_count(),
            },
        }
    }
}

/// Summary of the current viewport, derived from a `VisibleWindow`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportState {
    pub scroll_row: usize,
    pub scroll_col: usize,
    pub visible_rows: usize,
    pub visible_cols: usize,
}

/// One scrollbar, in row or column units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRange {
    pub position: usize,
    /// Rows/columns that fit entirely in the container.
    pub page: usize,
    pub total: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollbarState {
    pub vertical: ScrollRange,
    pub horizontal: ScrollRange,
}

/// Computes visible windows. Holds only layout constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportComputer {
    /// Space between adjacent columns.
    pub column_gap: f32,
}

impl Default for ViewportComputer {
    fn default() -> Self {
        Self { column_gap: 1.0 }
    }
}

fn clamp_scroll(scroll: i64, extent: usize) -> usize {
    if extent == 0 {
        return 0;
    }
    let max = (extent - 1) as i64;
    scroll.clamp(0, max) as usize
}

fn row_height_or_min(row_height: f32) -> f32 {
    if row_height.is_finite() && row_height > 0.0 {
        row_height
    } else {
        MIN_ROW_HEIGHT
    }
}

impl ViewportComputer {
    pub fn new(column_gap: f32) -> Self {
        Self { column_gap: column_gap.max(0.0) }
    }

    pub fn compute_visible(
        &self,
        container: Size,
        row_height: f32,
        widths: &[f32],
        row_count: usize,
        scroll_row: i64,
        scroll_col: i64,
    ) -> VisibleWindow {
        if row_count == 0 || widths.is_empty() {
            return VisibleWindow::Empty;
        }
        let row_height = row_height_or_min(row_height);

        let first_row = clamp_scroll(scroll_row, row_count);
        let rows_fit = ((container.height.max(0.0) / row_height).ceil() as usize).max(1);
        let last_row = first_row.saturating_add(rows_fit - 1).min(row_count - 1);

        let first_col = clamp_scroll(scroll_col, widths.len());
        let mut last_col = first_col;
        let mut x = 0.0;
        for (col, width) in widths.iter().enumerate().skip(first_col) {
            last_col = col;
            x += sanitize_width(*width);
            if x >= container.width {
                break;
            }
            x += self.column_gap;
        }

        VisibleWindow::Range(VisibleRange {
            first_row,
            last_row,
            first_col,
            last_col,
            row_offset_px: first_row as f32 * row_height,
            col_offset_px: self.column_offset(widths, first_col),
        })
    }

    /// Content-space x of column `col`'s left edge.
    pub fn column_offset(&self, widths: &[f32], col: usize) -> f32 {
        widths
            .iter()
            .take(col)
            .map(|w| sanitize_width(*w) + self.column_gap)
            .sum()
    }

    /// Total horizontal extent: widths plus gaps between columns.
    pub fn content_width(&self, widths: &[f32]) -> f32 {
        let gaps = widths.len().saturating_sub(1) as f32 * self.column_gap;
        widths.iter().map(|w| sanitize_width(*w)).sum::<f32>() + gaps
    }

    /// Rows that fit entirely in the container (at least 1).
    pub fn full_rows(&self, container: Size, row_height: f32) -> usize {
        ((container.height.max(0.0) / row_height_or_min(row_height)).floor() as usize).max(1)
    }

    /// Columns starting at `first_col` that fit entirely (at least 1).
    pub fn full_cols(&self, container: Size, widths: &[f32], first_col: usize) -> usize {
        let mut x = 0.0;
        let mut count = 0;
        for width in widths.iter().skip(first_col) {
            x += sanitize_width(*width);
            if x > container.width {
                break;
            }
            count += 1;
            x += self.column_gap;
        }
        count.max(1)
    }

    pub fn scrollbars(
        &self,
        container: Size,
        row_height: f32,
        widths: &[f32],
        row_count: usize,
        scroll_row: i64,
        scroll_col: i64,
    ) -> ScrollbarState {
        let page_rows = self.full_rows(container, row_height).min(row_count);
        let first_col = clamp_scroll(scroll_col, widths.len());
        let page_cols = if widths.is_empty() { 0 } else { self.full_cols(container, widths, first_col) };

        ScrollbarState {
            vertical: ScrollRange {
                position: clamp_scroll(scroll_row, row_count),
                page: page_rows,
                total: row_count,
                visible: row_count > page_rows,
            },
            horizontal: ScrollRange {
                position: first_col,
                page: page_cols,
                total: widths.len(),
                visible: self.content_width(widths) > container.width,
            },
        }
    }

    /// Smallest scroll change that brings `cursor` fully on screen.
    pub fn ensure_visible(
        &self,
        cursor: (usize, usize),
        container: Size,
        row_height: f32,
        widths: &[f32],
        scroll: (usize, usize),
    ) -> (usize, usize) {
        let (row, col) = cursor;
        let (mut scroll_row, mut scroll_col) = scroll;

        let rows = self.full_rows(container, row_height);
        if row < scroll_row {
            scroll_row = row;
        } else if row >= scroll_row + rows {
            scroll_row = row + 1 - rows;
        }

        if col < scroll_col {
            scroll_col = col;
        } else {
            while scroll_col < col && col >= scroll_col + self.full_cols(container, widths, scroll_col) {
                scroll_col += 1;
            }
        }

        (scroll_row, scroll_col)
    }

    /// Drawn rectangle of (row, col) inside `range`.
    pub fn cell_rect(&self, range: &VisibleRange, row: usize, col: usize, row_height: f32, widths: &[f32]) -> Rect {
        let row_height = row_height_or_min(row_height);
        let x = self.column_offset(widths, col) - range.col_offset_px;
        Rect {
            x,
            y: row.saturating_sub(range.first_row) as f32 * row_height,
            width: widths.get(col).copied().map(sanitize_width).unwrap_or(0.0),
            height: row_height,
        }
    }
}

/// Give flexible columns an equal share of the width left over by the
/// fixed columns, never less than `min_width`. Returns true if any width
/// changed.
pub fn distribute_flexible(columns: &mut [Column], available: f32, gap: f32, min_width: f32) -> bool {
    let flexible = columns.iter().filter(|c| c.flexible).count();
    if flexible == 0 {
        return false;
    }

    let fixed: f32 = columns.iter().filter(|c| !c.flexible).map(|c| c.width).sum();
    let gaps = columns.len().saturating_sub(1) as f32 * gap;
    let leftover = (available - fixed - gaps).max(0.0);
    let share = sanitize_width((leftover / flexible as f32).floor().max(min_width));

    let mut changed = false;
    for column in columns.iter_mut().filter(|c| c.flexible) {
        if column.width != share {
            column.width = share;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computer() -> ViewportComputer {
        ViewportComputer::new(0.0)
    }

    fn range(w: VisibleWindow) -> VisibleRange {
        *w.range().expect("non-empty window")
    }

    #[test]
    fn test_empty_grid() {
        let vc = computer();
        assert_eq!(vc.compute_visible(Size::new(100.0, 100.0), 10.0, &[], 5, 0, 0), VisibleWindow::Empty);
        assert_eq!(vc.compute_visible(Size::new(100.0, 100.0), 10.0, &[10.0], 0, 0, 0), VisibleWindow::Empty);
    }

    #[test]
    fn test_partial_last_row_and_column_included() {
        let vc = computer();
        let r = range(vc.compute_visible(Size::new(25.0, 25.0), 10.0, &[10.0; 10], 100, 0, 0));
        assert_eq!((r.first_row, r.last_row), (0, 2));
        assert_eq!((r.first_col, r.last_col), (0, 2));
    }

    #[test]
    fn test_scroll_offsets() {
        let vc = ViewportComputer::new(1.0);
        let r = range(vc.compute_visible(Size::new(30.0, 30.0), 10.0, &[10.0; 10], 100, 5, 2));
        assert_eq!(r.first_row, 5);
        assert_eq!(r.row_offset_px, 50.0);
        assert_eq!(r.first_col, 2);
        assert_eq!(r.col_offset_px, 22.0);
    }

    #[test]
    fn test_scroll_clamped() {
        let vc = computer();
        let r = range(vc.compute_visible(Size::new(30.0, 30.0), 10.0, &[10.0; 4], 5, -3, 99));
        assert_eq!(r.first_row, 0);
        assert_eq!(r.last_row, 2);
        assert_eq!((r.first_col, r.last_col), (3, 3));

        let r = range(vc.compute_visible(Size::new(30.0, 30.0), 10.0, &[10.0; 4], 5, 100, 0));
        assert_eq!((r.first_row, r.last_row), (4, 4));
    }

    #[test]
    fn test_zero_container_still_shows_one_cell() {
        let vc = computer();
        let r = range(vc.compute_visible(Size::new(0.0, 0.0), 10.0, &[10.0; 4], 5, 0, 0));
        assert_eq!((r.row_count(), r.col_count()), (1, 1));
    }

    #[test]
    fn test_content_width_and_horizontal_bar() {
        let vc = ViewportComputer::new(1.0);
        assert_eq!(vc.content_width(&[10.0, 10.0, 10.0]), 32.0);

        let bars = vc.scrollbars(Size::new(40.0, 20.0), 10.0, &[10.0, 10.0, 10.0], 10, 0, 0);
        assert!(!bars.horizontal.visible);
        assert!(bars.vertical.visible);
        assert_eq!(bars.vertical.page, 2);
        assert_eq!(bars.vertical.total, 10);

        let bars = vc.scrollbars(Size::new(31.0, 200.0), 10.0, &[10.0, 10.0, 10.0], 10, 0, 1);
        assert!(bars.horizontal.visible);
        assert_eq!(bars.horizontal.position, 1);
        assert!(!bars.vertical.visible);
    }

    #[test]
    fn test_ensure_visible() {
        let vc = computer();
        let size = Size::new(30.0, 30.0);
        let widths = [10.0; 10];
        assert_eq!(vc.ensure_visible((1, 1), size, 10.0, &widths, (0, 0)), (0, 0));
        assert_eq!(vc.ensure_visible((5, 0), size, 10.0, &widths, (0, 0)), (3, 0));
        assert_eq!(vc.ensure_visible((2, 0), size, 10.0, &widths, (4, 0)), (2, 0));
        assert_eq!(vc.ensure_visible((0, 7), size, 10.0, &widths, (0, 0)), (0, 5));
        assert_eq!(vc.ensure_visible((0, 1), size, 10.0, &widths, (0, 5)), (0, 1));
    }

    #[test]
    fn test_cell_rect() {
        let vc = ViewportComputer::new(1.0);
        let widths = [10.0, 5.0, 8.0];
        let r = range(vc.compute_visible(Size::new(100.0, 100.0), 2.0, &widths, 10, 3, 1));
        let rect = vc.cell_rect(&r, 4, 2, 2.0, &widths);
        assert_eq!(rect, Rect { x: 6.0, y: 2.0, width: 8.0, height: 2.0 });
    }

    #[test]
    fn test_distribute_flexible() {
        let mut cols = vec![
            Column::text("a").with_width(10.0),
            Column::text("b").flexible(),
            Column::text("c").flexible(),
        ];
        assert!(distribute_flexible(&mut cols, 52.0, 1.0, 5.0));
        assert_eq!(cols[1].width, 20.0);
        assert_eq!(cols[2].width, 20.0);

        assert!(distribute_flexible(&mut cols, 12.0, 1.0, 5.0));
        assert_eq!(cols[1].width, 5.0);
        assert!(!distribute_flexible(&mut cols, 12.0, 1.0, 5.0));
        assert_eq!(cols[0].width, 10.0);
    }
}
