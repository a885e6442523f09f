// Key actions example: drive the table with the built-in keymap plus one custom binding.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use tui_treetable::prelude::*;

struct Task {
    title: &'static str,
    priority: u32,
}

fn task(id: &str, title: &'static str, priority: u32) -> Row<Task> {
    Row::new(id, "task", Task { title, priority })
}

// App-level actions resolved before the built-in bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
enum AppAction {
    Delete,
}

fn map_key(event: KeyEvent) -> Option<AppAction> {
    match (event.code, event.modifiers) {
        (KeyCode::Delete | KeyCode::Char('d'), KeyModifiers::NONE) => Some(AppAction::Delete),
        _ => None,
    }
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn main() -> Result<(), TableError> {
    let columns = ColumnSet::new(vec![
        Column::new("title").value(|t: &Task| CellValue::text(t.title)),
        Column::new("priority").value(|t: &Task| t.priority.into()),
    ]);
    let mut table = TableState::new(columns, TableOptions::new());
    table.set_rows(vec![
        task("release", "Release 0.2", 1).children([
            task("notes", "Write notes", 2),
            task("tag", "Tag commit", 1),
        ]),
        task("triage", "Triage issues", 3),
    ])?;

    // Vim-style navigation; selection keys are shared across profiles.
    table.keymap_mut().set_profile(KeymapProfile::Vim);

    // Move to "notes", select it, then sort by the second visible column.
    let keys = [
        press(KeyCode::Char('j')),
        press(KeyCode::Char('j')),
        press(KeyCode::Char(' ')),
        press(KeyCode::Char('2')),
    ];
    for key in keys {
        table.handle_key(key)?;
    }
    println!("active: {:?}", table.active_row_id());
    println!("sorted by: {:?}", table.sort_spec());

    // Custom keys come back as events for the app to act on.
    if let TableEvent::Action(TableAction::Custom(AppAction::Delete)) =
        table.handle_key_with(press(KeyCode::Char('d')), map_key)?
    {
        let selected = table.selected_row_ids(None);
        table.delete_rows(selected.iter());
    }

    for row in table.rendered_rows().iter() {
        println!("{}", table.rendered_row_id(row));
    }
    Ok(())
}
