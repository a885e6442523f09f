// Grid example: a file hierarchy rendered into an in-memory buffer with ratatui's Table.
use std::cell::RefCell;
use std::rc::Rc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::{Cell, Row as Line, StatefulWidget, Table};

use tui_treetable::prelude::*;
use tui_treetable::kept_group_label;

struct File {
    name: &'static str,
    size: Option<u32>,
}

fn file(id: &str, name: &'static str, size: u32) -> Row<File> {
    Row::new(id, "file", File { name, size: Some(size) })
}

fn folder(id: &str, name: &'static str) -> Row<File> {
    Row::new(id, "dir", File { name, size: None })
}

fn checkbox(state: SelectionState) -> &'static str {
    match state {
        SelectionState::Checked => "[x]",
        SelectionState::Unchecked => "[ ]",
        SelectionState::Indeterminate => "[-]",
    }
}

// Maps the engine's flattened rows to table lines.
fn lines(table: &TableState<File>) -> Vec<Line<'static>> {
    table
        .rendered_rows()
        .iter()
        .map(|rendered| match *rendered {
            RenderedRow::KeptGroup { count, collapsed } => {
                let arrow = if collapsed { "▸" } else { "▾" };
                Line::new([Cell::from(format!("[x] {arrow} {}", kept_group_label(count)))])
            }
            RenderedRow::Row { index, depth, .. } => {
                let row = table.tree().row(index);
                let state = table
                    .row_state(row.id())
                    .map(|state| state.selection)
                    .unwrap_or_default();
                let arrow = match (row.has_children(), table.is_collapsed_row(row.id())) {
                    (false, _) => " ",
                    (true, true) => "▸",
                    (true, false) => "▾",
                };
                let indent = "  ".repeat(usize::from(depth));
                let size = row.data().size.map_or_else(String::new, |size| size.to_string());
                Line::new([
                    Cell::from(format!("{} {indent}{arrow} {}", checkbox(state), row.data().name)),
                    Cell::from(size),
                ])
            }
        })
        .collect()
}

fn main() -> Result<(), TableError> {
    let columns = ColumnSet::new(vec![
        Column::new("name")
            .header("Name")
            .width(ColumnWidth { min: 12, ideal: 28, max: 40 })
            .value(|f: &File| CellValue::text(f.name)),
        Column::new("size")
            .header("Size")
            .width(ColumnWidth::fixed(8))
            .value(|f: &File| f.size.into()),
    ]);
    let options = TableOptions::new()
        .collapse_storage_key("grid-demo")
        .initial_sort(InitialSort::FirstSortable);
    let mut table = TableState::with_storage(columns, options, MemoryStorage::new());

    table.set_rows(vec![
        folder("src", "src").children([
            file("lib", "lib.rs", 1200),
            file("state", "state.rs", 5400),
            folder("bin", "bin").child(file("main", "main.rs", 300)),
        ]),
        folder("docs", "docs").init_collapsed(true).child(file("guide", "guide.md", 800)),
        file("readme", "Readme.md", 90),
    ])?;

    // Selection survives the filter: `lib.rs` moves to the kept group.
    table.select_row("lib", true);
    table.select_row("state", true);
    table.set_filter_text("state");
    table.toggle_collapsed_row(tui_treetable::KEPT_GROUP_ID);
    table.toggle_sort("size")?;

    // The view state doubles as the scroll host.
    let view = Rc::new(RefCell::new(ratatui::widgets::TableState::default()));
    table.attach_scroll_host(Rc::clone(&view));
    table.scroll_to_index(0);

    let area = Rect::new(0, 0, 48, 10);
    let widget = Table::new(lines(&table), table.visible_constraints(area.width))
        .header(Line::new(["Name", "Size"]));
    let mut buffer = Buffer::empty(area);
    widget.render(area, &mut buffer, &mut view.borrow_mut());

    for y in 0..area.height {
        let line: String = (0..area.width)
            .map(|x| buffer[(x, y)].symbol())
            .collect();
        println!("{}", line.trim_end());
    }
    println!("selected: {:?}", table.selected_row_ids(None));
    Ok(())
}
