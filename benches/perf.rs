use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tui_treetable::prelude::*;

struct Entry {
    name: String,
    value: u32,
}

fn columns() -> ColumnSet<Entry> {
    ColumnSet::new(vec![
        Column::new("name").value(|e: &Entry| CellValue::text(e.name.clone())),
        Column::new("value").value(|e: &Entry| e.value.into()),
    ])
}

// 100 groups of 99 rows each: 10k rows in total.
fn rows() -> Vec<Row<Entry>> {
    (0..100u32)
        .map(|g| {
            let group = Entry {
                name: format!("group {g}"),
                value: g,
            };
            Row::new(format!("g{g}"), "group", group).children((0..99u32).map(|i| {
                let entry = Entry {
                    name: format!("item {g}-{i}"),
                    value: (i * 7919 + g) % 1000,
                };
                Row::new(format!("g{g}-{i}"), "item", entry)
            }))
        })
        .collect()
}

fn loaded() -> TableState<Entry> {
    let mut table = TableState::new(columns(), TableOptions::new());
    table.set_rows(rows()).expect("bench rows have unique ids");
    table
}

fn bench_set_rows(c: &mut Criterion) {
    c.bench_function("set_rows_10k", |b| {
        let mut table = TableState::new(columns(), TableOptions::new());
        b.iter(|| table.set_rows(black_box(rows())));
    });
}

fn bench_sort(c: &mut Criterion) {
    let mut table = loaded();
    c.bench_function("toggle_sort_10k", |b| {
        b.iter(|| {
            let _ = table.toggle_sort(black_box("value"));
            table.rendered_rows().len()
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut table = loaded();
    let terms = ["item 4", "", "9-1", ""];
    let mut next = 0;
    c.bench_function("filter_10k", |b| {
        b.iter(|| {
            table.set_filter_text(black_box(terms[next % terms.len()]));
            next += 1;
            table.rendered_rows().len()
        });
    });
}

fn bench_select_all(c: &mut Criterion) {
    let mut table = loaded();
    let mut selected = false;
    c.bench_function("select_all_10k", |b| {
        b.iter(|| {
            selected = !selected;
            table.select_row(tui_treetable::HEADER_ID, selected);
            table.selected_row_ids(None).len()
        });
    });
}

criterion_group!(benches, bench_set_rows, bench_sort, bench_filter, bench_select_all);
criterion_main!(benches);
