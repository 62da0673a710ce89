// End-to-end grid scenarios through the public API.

use tabgrid_engine::style::{attr, Mode, RuleMode, StyleRule, Variable};
use tabgrid_engine::{
    Activation, Column, EditKey, EditState, GridController, GridError, GridOptions, StyleResolver, Value,
    ValueKind,
};

fn inventory() -> GridController {
    let columns = vec![Column::text("Item"), Column::number("Qty"), Column::readonly("Sku")];
    let mut grid = GridController::new(columns, 5, StyleResolver::new(), GridOptions::default());
    let rows = (0..5)
        .map(|i| vec![Value::text(format!("item {i}")), Value::from(i * 10), Value::text(format!("SKU-{i}"))])
        .collect();
    grid.load_rows(rows).unwrap();
    grid.on_resize(80.0, 24.0);
    grid
}

#[test]
fn edit_number_cell_rejects_text_then_commits() {
    let mut grid = inventory();
    assert_eq!(grid.on_cell_activate(2, 1).unwrap(), Activation::Editing);

    grid.on_key_input(EditKey::Clear).unwrap();
    for ch in "abc".chars() {
        grid.on_key_input(EditKey::Char(ch)).unwrap();
    }
    match grid.on_commit_request() {
        Err(GridError::InvalidValue { row: 2, col: 1, kind: ValueKind::Number, .. }) => {}
        other => panic!("expected InvalidValue, got {other:?}"),
    }
    let session = grid.session().expect("session stays open");
    assert_eq!(session.state(), EditState::Editing);
    assert!(grid.display_model().editor.unwrap().error.is_some());

    grid.on_key_input(EditKey::Clear).unwrap();
    grid.on_key_input(EditKey::Char('4')).unwrap();
    grid.on_key_input(EditKey::Char('2')).unwrap();
    assert_eq!(grid.on_commit_request().unwrap(), Value::from(20));

    let cell = grid.get_cell(2, 1).unwrap();
    assert_eq!(cell.value, Value::from(42));
    assert!(cell.dirty);
    assert_eq!(grid.export_dirty_cells(), vec![cell]);
}

#[test]
fn readonly_column_only_highlights() {
    let mut grid = inventory();
    assert_eq!(grid.on_cell_activate(0, 2).unwrap(), Activation::Highlight);
    assert!(grid.session().is_none());

    // Programmatic writes still reach a readonly column.
    grid.set_cell_value(0, 2, Value::text("SKU-X")).unwrap();
    assert!(grid.get_cell(0, 2).unwrap().dirty);
}

#[test]
fn header_color_follows_mode_variable() {
    let resolver = StyleResolver::new();
    resolver
        .load_rules(
            vec![StyleRule::new("header", RuleMode::Any).attr(attr::COLOR, "var(accent)")],
            vec![Variable::new("accent", "#000", "#fff")],
        )
        .unwrap();

    assert_eq!(resolver.resolve("header", Mode::Dark).color(), Some("#fff"));
    assert_eq!(resolver.resolve("header", Mode::Light).color(), Some("#000"));
}

#[test]
fn unknown_variable_keeps_previous_rules() {
    let resolver = StyleResolver::new();
    resolver.load_document("accent = #000 / #fff\n#-----#\nheader { color: {accent} }").unwrap();

    let err = resolver.load_document("header { color: {missing} }").unwrap_err();
    assert_eq!(err.code(), "unknown_variable");
    assert_eq!(resolver.resolve("header", Mode::Dark).color(), Some("#fff"));
}

#[test]
fn saving_clears_dirty_without_touching_values() {
    let mut grid = inventory();
    grid.set_cell_value(1, 0, Value::text("renamed")).unwrap();
    grid.set_cell_value(3, 1, Value::from(7)).unwrap();
    assert_eq!(grid.export_dirty_cells().len(), 2);

    grid.mark_saved(1, 0).unwrap();
    assert_eq!(grid.export_dirty_cells().len(), 1);
    grid.mark_all_saved();
    assert!(grid.export_dirty_cells().is_empty());
    assert_eq!(grid.get_cell(3, 1).unwrap().value, Value::from(7));
}

#[test]
fn mode_switch_changes_resolved_cells() {
    let mut grid = inventory();
    grid.resolver().load_document("fg = #111 / #eee\n#-----#\ncell { color: {fg} }").unwrap();

    let dark = grid.display_model();
    assert_eq!(dark.cells[0].style.color(), Some("#eee"));

    grid.set_mode(Mode::Light);
    let light = grid.display_model();
    assert_eq!(light.cells[0].style.color(), Some("#111"));
}
