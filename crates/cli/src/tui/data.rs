use std::path::Path;

use tabgrid_engine::column::column_letters;
use tabgrid_engine::{CellStore, Column, Value, ValueKind};

use crate::util;

/// Narrowest and widest column width inferred from file contents.
const MIN_INFERRED_WIDTH: usize = 3;
const MAX_INFERRED_WIDTH: usize = 40;

/// A CSV/TSV file as raw strings, before it becomes a grid.
#[derive(Debug, Clone)]
pub struct Table {
    /// Header row (`--headers`) or generated A, B, C...
    pub col_names: Vec<String>,
    /// Row-major fields, every row padded to `col_names.len()`.
    pub rows: Vec<Vec<String>>,
    pub has_headers: bool,
    pub delimiter: u8,
}

impl Table {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.col_names.len()
    }

    /// Guess each column's kind and width from its fields.
    ///
    /// A column whose non-blank fields all parse as numbers is a number
    /// column; all `true`/`false` makes a boolean column; anything else,
    /// including an all-blank column, is text.
    pub fn infer_columns(&self) -> Vec<Column> {
        (0..self.num_cols())
            .map(|c| {
                let fields = || self.rows.iter().map(move |row| row[c].as_str()).filter(|s| !s.trim().is_empty());
                let kind = if fields().next().is_none() {
                    ValueKind::Text
                } else if fields().all(|s| matches!(Value::from_input(s), Value::Number(_))) {
                    ValueKind::Number
                } else if fields().all(|s| matches!(Value::from_input(s), Value::Bool(_))) {
                    ValueKind::Boolean
                } else {
                    ValueKind::Text
                };

                let header_w = util::display_width(&self.col_names[c]);
                let max_cell = self.rows.iter().map(|row| util::display_width(&row[c])).max().unwrap_or(0);
                let width = header_w.max(max_cell).clamp(MIN_INFERRED_WIDTH, MAX_INFERRED_WIDTH);

                Column::new(self.col_names[c].clone(), kind).with_width(width as f32)
            })
            .collect()
    }

    /// Mirror a row inserted into the grid at `at`.
    pub fn insert_row(&mut self, at: usize) {
        let at = at.min(self.rows.len());
        self.rows.insert(at, vec![String::new(); self.num_cols()]);
    }

    /// Mirror a row removed from the grid at `at`.
    pub fn remove_row(&mut self, at: usize) {
        if at < self.rows.len() {
            self.rows.remove(at);
        }
    }

    /// Typed values for `columns` (as returned by `infer_columns`).
    pub fn values(&self, columns: &[Column]) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(columns)
                    .map(|(field, column)| match column.kind {
                        _ if field.trim().is_empty() => Value::Null,
                        ValueKind::Number | ValueKind::Boolean => Value::from_input(field),
                        _ => Value::text(field.as_str()),
                    })
                    .collect()
            })
            .collect()
    }
}

/// `\t` for `.tsv`/`.tab` files, `,` for everything else.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    }
}

/// Load a CSV or TSV file. Ragged rows are padded with empty fields.
pub fn load_csv(path: &Path, delimiter: u8, has_headers: bool) -> Result<Table, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| format!("CSV parse error: {}", e))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);

    let header_row = if has_headers && !rows.is_empty() { Some(rows.remove(0)) } else { None };
    let col_names = (0..max_cols)
        .map(|i| {
            header_row
                .as_ref()
                .and_then(|h| h.get(i))
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| column_letters(i))
        })
        .collect();

    for row in &mut rows {
        row.resize(max_cols, String::new());
    }

    log::debug!("loaded {} ({} rows x {} cols)", path.display(), rows.len(), max_cols);
    Ok(Table { col_names, rows, has_headers, delimiter })
}

/// Write the store back in the table's format. The header row is written
/// only if the file had one.
///
/// Cells that are not dirty keep the text they were read with, so saving
/// never reformats untouched fields (`02134` stays `02134`). Afterwards the
/// table holds exactly what was written.
pub fn save_csv(path: &Path, table: &mut Table, store: &CellStore) -> Result<(), String> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(table.delimiter)
        .from_path(path)
        .map_err(|e| format!("failed to create {}: {}", path.display(), e))?;

    if table.has_headers {
        let labels: Vec<&str> = store.columns().iter().map(|c| c.label.as_str()).collect();
        wtr.write_record(&labels).map_err(|e| format!("write error: {}", e))?;
    }

    let mut written = Vec::with_capacity(store.rows());
    for row in 0..store.rows() {
        let mut record = Vec::with_capacity(store.cols());
        for col in 0..store.cols() {
            let original = table.rows.get(row).and_then(|r| r.get(col));
            let field = match original {
                Some(text) if !store.is_dirty(row, col) => text.clone(),
                _ => store.value(row, col).map_err(|e| e.to_string())?.display(),
            };
            record.push(field);
        }
        wtr.write_record(&record).map_err(|e| format!("write error: {}", e))?;
        written.push(record);
    }

    wtr.flush().map_err(|e| format!("write error: {}", e))?;
    table.rows = written;
    log::info!("saved {} ({} rows)", path.display(), store.rows());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn ragged_rows_padded() {
        let f = write_csv("a,b,c\n1,2\n3\n");
        let table = load_csv(f.path(), b',', false).unwrap();
        assert_eq!(table.num_cols(), 3);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows[1], vec!["1", "2", ""]);
        assert_eq!(table.col_names, vec!["A", "B", "C"]);
    }

    #[test]
    fn headers_consumed() {
        let f = write_csv("Name,Qty\nAlice,100\nBob,200\n");
        let table = load_csv(f.path(), b',', true).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.col_names, vec!["Name", "Qty"]);
    }

    #[test]
    fn blank_header_falls_back_to_letter() {
        let f = write_csv("Name,,Flag\nx,1,true\n");
        let table = load_csv(f.path(), b',', true).unwrap();
        assert_eq!(table.col_names, vec!["Name", "B", "Flag"]);
    }

    #[test]
    fn infers_kinds_and_alignment() {
        let f = write_csv("Name,Qty,Done,Empty\nwidget,3,true,\ngadget,,false,\nthing,2.5,FALSE,\n");
        let table = load_csv(f.path(), b',', true).unwrap();
        let columns = table.infer_columns();
        let kinds: Vec<ValueKind> = columns.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ValueKind::Text, ValueKind::Number, ValueKind::Boolean, ValueKind::Text]);

        let values = table.values(&columns);
        assert_eq!(values[0][1], Value::from(3));
        assert_eq!(values[1][1], Value::Null);
        assert_eq!(values[2][2], Value::Bool(false));
        assert_eq!(values[0][3], Value::Null);
    }

    #[test]
    fn numeric_text_in_text_column_stays_text() {
        let f = write_csv("Code\n007\nabc\n");
        let table = load_csv(f.path(), b',', true).unwrap();
        let columns = table.infer_columns();
        assert_eq!(columns[0].kind, ValueKind::Text);
        assert_eq!(table.values(&columns)[0][0], Value::text("007"));
    }

    #[test]
    fn widths_clamped() {
        let long = "x".repeat(60);
        let f = write_csv(&format!("a,b\n1,{long}\n"));
        let table = load_csv(f.path(), b',', false).unwrap();
        let columns = table.infer_columns();
        assert_eq!(columns[0].width, MIN_INFERRED_WIDTH as f32);
        assert_eq!(columns[1].width, MAX_INFERRED_WIDTH as f32);
    }

    #[test]
    fn tsv_delimiter_by_extension() {
        assert_eq!(delimiter_for(Path::new("data.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("data.TAB")), b'\t');
        assert_eq!(delimiter_for(Path::new("data.csv")), b',');
    }

    #[test]
    fn save_round_trips_edits() {
        let f = write_csv("Name,Qty\nwidget,3\ngadget,4\n");
        let table = load_csv(f.path(), b',', true).unwrap();
        let columns = table.infer_columns();
        let mut store = CellStore::new(columns.clone(), table.num_rows());
        store.load_rows(table.values(&columns)).unwrap();
        store.set(1, 1, Value::from(42)).unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        let mut table = table;
        save_csv(out.path(), &mut table, &store).unwrap();
        let written = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(written, "Name,Qty\nwidget,3\ngadget,42\n");
    }

    #[test]
    fn save_without_edits_keeps_original_text() {
        let content = "Zip,Price,Done\n02134,1.50,TRUE\n10001,2.00,false\n";
        let f = write_csv(content);
        let mut table = load_csv(f.path(), b',', true).unwrap();
        let columns = table.infer_columns();
        assert_eq!(columns[0].kind, ValueKind::Number);
        let mut store = CellStore::new(columns.clone(), table.num_rows());
        store.load_rows(table.values(&columns)).unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        save_csv(out.path(), &mut table, &store).unwrap();
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), content);
    }

    #[test]
    fn save_after_row_changes_keeps_untouched_rows() {
        let f = write_csv("Zip\n02134\n10001\n07030\n");
        let mut table = load_csv(f.path(), b',', true).unwrap();
        let columns = table.infer_columns();
        let mut store = CellStore::new(columns.clone(), table.num_rows());
        store.load_rows(table.values(&columns)).unwrap();

        store.remove_row(1).unwrap();
        table.remove_row(1);
        store.insert_row(0).unwrap();
        table.insert_row(0);
        store.set(0, 0, Value::from(99)).unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        save_csv(out.path(), &mut table, &store).unwrap();
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "Zip\n99\n02134\n07030\n");

        // The table now holds the saved text; a second save is identical.
        store.mark_all_saved();
        save_csv(out.path(), &mut table, &store).unwrap();
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "Zip\n99\n02134\n07030\n");
    }

    #[test]
    fn empty_csv() {
        let f = write_csv("");
        let table = load_csv(f.path(), b',', true).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_cols(), 0);
        assert!(table.infer_columns().is_empty());
    }
}
