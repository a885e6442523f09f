use std::cell::Cell;
use std::rc::Rc;

use tui_treetable::prelude::*;
use tui_treetable::{
    DirStorage, EXPANDED_COLUMN_KEY_PREFIX, HEADER_ID, KEPT_GROUP_ID, ScrollPolicy,
    ViewportScroll,
};

struct File {
    name: &'static str,
    size: Option<f64>,
}

fn file(id: &str, name: &'static str, size: f64) -> Row<File> {
    Row::new(id, "file", File { name, size: Some(size) })
}

fn dir(id: &str, name: &'static str) -> Row<File> {
    Row::new(id, "dir", File { name, size: None })
}

fn columns() -> ColumnSet<File> {
    ColumnSet::new(vec![
        Column::new("name").value(|f: &File| CellValue::text(f.name)),
        Column::new("size").value(|f: &File| f.size.into()),
        Column::new("owner")
            .init_visible(false)
            .value(|_: &File| CellValue::text("root")),
    ])
}

fn ids(table: &TableState<File>) -> Vec<String> {
    table
        .rendered_rows()
        .iter()
        .map(|row| table.rendered_row_id(row).to_owned())
        .collect()
}

#[test]
fn hidden_selection_is_reported_and_counted_in_header() {
    let mut table = TableState::new(columns(), TableOptions::new());
    table
        .set_rows(vec![dir("p1", "src").children([
            file("c1", "lib.rs", 10.0),
            file("c2", "main.rs", 20.0),
        ])])
        .unwrap();

    table.select_row("c1", true);
    assert_eq!(&*table.selected_row_ids(None), ["c1"]);
    assert_eq!(table.row_state("p1").unwrap().selection, SelectionState::Indeterminate);
    assert_eq!(table.header_selection(), SelectionState::Indeterminate);

    table.select_row("c2", true);
    assert_eq!(table.row_state("p1").unwrap().selection, SelectionState::Checked);
    assert_eq!(table.header_selection(), SelectionState::Checked);

    table.set_filter_text("lib");
    assert_eq!(table.row_state("p1").unwrap().selection, SelectionState::Checked);
    assert_eq!(&*table.selected_row_ids(None), ["c1", "c2"]);
    assert_eq!(table.header_selection(), SelectionState::Checked);
    assert_eq!(ids(&table), vec![KEPT_GROUP_ID, "p1", "c1"]);

    table.set_filter_text("");
    assert_eq!(&*table.selected_row_ids(None), ["c1", "c2"]);
    assert_eq!(ids(&table), vec!["p1", "c1", "c2"]);
}

#[test]
fn non_inferring_parent_is_not_kept_through_its_children() {
    let mut table = TableState::new(columns(), TableOptions::new());
    table
        .set_rows(vec![
            dir("p", "docs")
                .infer_selected_state(false)
                .children([file("a", "a.md", 1.0), file("b", "b.md", 2.0)]),
        ])
        .unwrap();

    table.select_row("a", true);
    table.set_filter_text("b.md");
    assert_eq!(table.row_state("p").unwrap().selection, SelectionState::Unchecked);
    assert!(!table.row_state("p").unwrap().is_kept);
    assert!(table.row_state("a").unwrap().is_kept);
}

#[test]
fn collapse_state_round_trips_through_directory_storage() {
    let dir_path = std::env::temp_dir().join(format!("tui-treetable-{}", std::process::id()));
    let options = || TableOptions::new().collapse_storage_key("files/tree");
    let rows = || {
        vec![
            dir("src", "src").init_collapsed(true).child(file("lib", "lib.rs", 1.0)),
            dir("docs", "docs").child(file("readme", "README", 2.0)),
        ]
    };

    let storage = DirStorage::open(&dir_path).unwrap();
    let mut table = TableState::with_storage(columns(), options(), storage.clone());
    table.set_rows(rows()).unwrap();
    assert_eq!(ids(&table), vec!["src", "docs", "readme"]);
    table.toggle_collapsed_row("src");
    table.toggle_collapsed_row("docs");

    let mut reloaded = TableState::with_storage(columns(), options(), storage);
    reloaded.set_rows(rows()).unwrap();
    assert!(!reloaded.is_collapsed_row("src"));
    assert!(reloaded.is_collapsed_row("docs"));
    assert_eq!(ids(&reloaded), vec!["src", "lib", "docs"]);

    std::fs::remove_dir_all(&dir_path).unwrap();
}

#[test]
fn corrupted_state_falls_back_to_initial_flags() {
    let storage = MemoryStorage::new();
    storage.set("tree", "{not json");
    storage.set("nameownersize", "[1, 2]");
    let columns = || {
        ColumnSet::new(vec![
            Column::new("name").value(|f: &File| CellValue::text(f.name)),
            Column::new("owner").init_visible(false),
            Column::new("size").value(|f: &File| f.size.into()),
        ])
    };

    let mut table = TableState::with_storage(
        columns(),
        TableOptions::new().collapse_storage_key("tree"),
        storage.clone(),
    );
    table
        .set_rows(vec![dir("d", "d").init_collapsed(true).child(file("f", "f", 1.0))])
        .unwrap();

    assert!(table.is_collapsed_row("d"));
    assert_eq!(table.visible_column_ids(), vec!["name", "size"]);
    assert_eq!(storage.get("tree").as_deref(), Some(r#"["d"]"#));
}

#[test]
fn column_flags_apply_only_to_new_ids() {
    let storage = MemoryStorage::new();
    let options = || TableOptions::new().columns_storage_key("grid");
    let mut table = TableState::with_storage(columns(), options(), storage.clone());
    assert_eq!(table.visible_column_ids(), vec!["name", "size"]);

    table.set_column_visible("owner", true);
    table.set_column_visible("size", false);
    table.toggle_expanded_column("name");
    assert_eq!(
        storage.get(&format!("{EXPANDED_COLUMN_KEY_PREFIX}grid")).as_deref(),
        Some(r#"["name"]"#)
    );

    let base = columns();
    let more = ColumnSet::new(
        base.iter()
            .cloned()
            .chain([Column::new("mtime").init_expanded(true)])
            .collect(),
    );
    table.set_columns(more).unwrap();
    assert_eq!(table.visible_column_ids(), vec!["name", "owner", "mtime"]);
    assert_eq!(table.expanded_column_ids(), vec!["name", "mtime"]);

    let reloaded = TableState::<File>::with_storage(columns(), options(), storage);
    assert_eq!(reloaded.visible_column_ids(), vec!["name", "owner"]);
    assert!(reloaded.is_column_expanded("name"));
}

#[test]
fn pinned_rows_hold_their_place_under_sort_and_filter() {
    let mut table = TableState::new(
        columns(),
        TableOptions::new().initial_sort(InitialSort::FirstSortable),
    );
    table
        .set_rows(vec![
            file("total", "zz total", 0.0).pin(RowPin::last()),
            file("b", "b.rs", 2.0),
            file("a", "a.rs", 1.0),
            file("up", "..", 0.0).pin(RowPin::first().filterable(true)),
        ])
        .unwrap();

    assert_eq!(ids(&table), vec!["up", "a", "b", "total"]);
    table.toggle_sort("name").unwrap();
    assert_eq!(ids(&table), vec!["up", "b", "a", "total"]);

    table.set_filter_text("a.rs");
    assert_eq!(ids(&table), vec!["a", "total"]);
}

#[test]
fn lazy_values_are_read_again_on_resort() {
    let weight = Rc::new(Cell::new(1.0));
    let shared = Rc::clone(&weight);
    let columns = ColumnSet::new(vec![
        Column::new("name").value(|f: &File| CellValue::text(f.name)),
        Column::new("score").sort_value(move |f: &File| {
            let weight = Rc::clone(&shared);
            let size = f.size.unwrap_or_default();
            CellValue::lazy(move || CellValue::Number(size * weight.get()))
        }),
    ]);
    let mut table = TableState::new(
        columns,
        TableOptions::new().initial_sort(InitialSort::Spec(SortSpec::asc("score"))),
    );
    table
        .set_rows(vec![file("small", "s", 1.0), file("big", "b", 5.0)])
        .unwrap();
    assert_eq!(ids(&table), vec!["small", "big"]);

    weight.set(-1.0);
    assert_eq!(ids(&table), vec!["small", "big"]);
    table.resort().unwrap();
    assert_eq!(ids(&table), vec!["big", "small"]);
}

#[test]
fn fallback_columns_cover_undeclared_keys() {
    let columns = columns().with_fallback(|key| {
        let key = key.to_owned();
        Column::new(key.clone()).value(move |f: &File| CellValue::text(format!("{key}:{}", f.name)))
    });
    let mut table = TableState::new(columns, TableOptions::new());
    table
        .set_rows(vec![file("x", "x", 1.0), file("y", "y", 2.0)])
        .unwrap();

    table.set_sort(Some(SortSpec::desc("label"))).unwrap();
    assert_eq!(ids(&table), vec!["y", "x"]);
}

#[test]
fn unselectable_rows_are_skipped_by_select_all() {
    let mut table = TableState::new(columns(), TableOptions::new());
    table
        .set_rows(vec![
            dir("d", "d").children([
                file("ro", "ro", 1.0).selectable(false),
                file("rw", "rw", 2.0),
            ]),
        ])
        .unwrap();

    table.select_row(HEADER_ID, true);
    assert_eq!(&*table.selected_row_ids(None), ["rw"]);
    assert_eq!(table.row_state("ro").unwrap().selection, SelectionState::Unchecked);
    assert_eq!(table.row_state("d").unwrap().selection, SelectionState::Checked);
}

#[test]
fn viewport_follows_active_row() {
    let mut table = TableState::new(columns(), TableOptions::new());
    table
        .set_rows((0..10).map(|i| file(&format!("f{i}"), "f", f64::from(i))).collect())
        .unwrap();
    let scroll = Rc::new(std::cell::RefCell::new(ViewportScroll::new(
        3,
        ScrollPolicy::CenterOnTarget,
    )));
    scroll.borrow_mut().set_total(table.rendered_rows().len());
    table.attach_scroll_host(Rc::clone(&scroll));

    for _ in 0..6 {
        table.handle_action::<()>(TableAction::ActivateNext).unwrap();
    }
    assert_eq!(table.active_row_id(), Some("f5"));
    assert_eq!(scroll.borrow().visible_range(), 4..7);

    table.detach_scroll_host();
    table.scroll_to_index(0);
    assert_eq!(scroll.borrow().offset(), 4);
}
