use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tree::{ChildList, RowTree};

/// Checkbox state of a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    Checked,
    #[default]
    Unchecked,
    Indeterminate,
}

impl SelectionState {
    pub const fn is_checked(self) -> bool {
        matches!(self, Self::Checked)
    }

    const fn from_bool(selected: bool) -> Self {
        if selected { Self::Checked } else { Self::Unchecked }
    }
}

/// Explicit per-row selection, written only by select/deselect operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionStore {
    selected: FxHashMap<String, bool>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: &str, selected: bool) {
        if let Some(current) = self.selected.get_mut(id) {
            *current = selected;
        } else {
            self.selected.insert(id.to_owned(), selected);
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.selected.remove(id);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.selected.retain(|id, _| keep(id));
    }

    pub fn is_empty(&self) -> bool {
        !self.selected.values().any(|&selected| selected)
    }

    /// Ids explicitly selected, in no particular order.
    pub fn selected_ids(&self) -> impl Iterator<Item = &str> {
        self.selected
            .iter()
            .filter_map(|(id, &selected)| selected.then_some(id.as_str()))
    }
}

/// Counts child states to derive a parent's tri-state.
#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    checked: usize,
    unchecked: usize,
    indeterminate: bool,
}

impl Tally {
    fn add(&mut self, state: SelectionState) {
        match state {
            SelectionState::Checked => self.checked += 1,
            SelectionState::Unchecked => self.unchecked += 1,
            SelectionState::Indeterminate => self.indeterminate = true,
        }
    }

    fn add_checked(&mut self, count: usize) {
        self.checked += count;
    }

    /// `None` when nothing was counted.
    const fn state(self) -> Option<SelectionState> {
        if self.indeterminate {
            return Some(SelectionState::Indeterminate);
        }
        match (self.checked, self.unchecked) {
            (0, 0) => None,
            (_, 0) => Some(SelectionState::Checked),
            (0, _) => Some(SelectionState::Unchecked),
            _ => Some(SelectionState::Indeterminate),
        }
    }
}

/// Selectable children of `idx` that pass the current filter.
pub(crate) fn selectable_visible_children<D>(
    tree: &RowTree<D>,
    visible: &[bool],
    idx: usize,
) -> ChildList {
    tree.row(idx)
        .children
        .iter()
        .copied()
        .filter(|&child| visible[child] && tree.row(child).selectable)
        .collect()
}

/// Children a selection on `idx` cascades to: the visible selectable ones, or every
/// selectable one when the filter hides them all.
fn cascade_targets<D>(tree: &RowTree<D>, visible: &[bool], idx: usize) -> ChildList {
    let children = selectable_visible_children(tree, visible, idx);
    if !children.is_empty() {
        return children;
    }
    tree.row(idx)
        .children
        .iter()
        .copied()
        .filter(|&child| tree.row(child).selectable)
        .collect()
}

/// Whether the row's own entry in the store is its source of truth.
///
/// Inferring parents with selectable children never are, whatever the filter shows.
pub(crate) fn is_source<D>(tree: &RowTree<D>, idx: usize) -> bool {
    let row = tree.row(idx);
    row.selectable
        && (!row.infer_selected_state
            || !row.children.iter().any(|&child| tree.row(child).selectable))
}

/// Selects or deselects a row, cascading through inferring parents to their
/// selectable descendants.
///
/// Visible children take the cascade when there are any; otherwise it reaches the
/// hidden ones, so the stored ids do not depend on the filter.
pub(crate) fn apply_selection<D>(
    store: &mut SelectionStore,
    tree: &RowTree<D>,
    visible: &[bool],
    idx: usize,
    selected: bool,
) {
    let row = tree.row(idx);
    if !row.selectable {
        return;
    }
    if row.infer_selected_state {
        let children = cascade_targets(tree, visible, idx);
        if !children.is_empty() {
            // Derived from children from now on.
            store.remove(row.id());
            for child in children {
                apply_selection(store, tree, visible, child, selected);
            }
            return;
        }
    }
    store.set(row.id(), selected);
}

/// Header toggle: every visible selectable row plus the kept rows.
pub(crate) fn apply_selection_to_all<D>(
    store: &mut SelectionStore,
    tree: &RowTree<D>,
    visible: &[bool],
    kept: &[usize],
    selected: bool,
) {
    for (idx, row) in tree.rows().iter().enumerate() {
        if !visible[idx] || !row.selectable {
            continue;
        }
        if is_source(tree, idx) {
            store.set(row.id(), selected);
        } else if selectable_visible_children(tree, visible, idx).is_empty() {
            apply_selection(store, tree, visible, idx, selected);
        } else {
            store.remove(row.id());
        }
    }
    for &idx in kept {
        store.set(tree.row(idx).id(), selected);
    }
}

/// Tri-state of every row, indexed like the arena.
pub(crate) fn derive_states<D>(
    tree: &RowTree<D>,
    visible: &[bool],
    store: &SelectionStore,
) -> Vec<SelectionState> {
    let rows = tree.rows();
    let mut states = vec![SelectionState::Unchecked; rows.len()];
    // Reverse pre-order: children are derived before their parents.
    for idx in (0..rows.len()).rev() {
        let row = &rows[idx];
        if !row.selectable {
            continue;
        }
        let own = SelectionState::from_bool(store.is_selected(row.id()));
        states[idx] = if row.infer_selected_state {
            let mut shown = Tally::default();
            let mut all = Tally::default();
            for &child in &row.children {
                if rows[child].selectable {
                    all.add(states[child]);
                    if visible[child] {
                        shown.add(states[child]);
                    }
                }
            }
            // Hidden children still carry the selection made through this row.
            shown.state().or_else(|| all.state()).unwrap_or(own)
        } else {
            own
        };
    }
    states
}

/// Selected rows hidden by the filter, in arena order.
pub(crate) fn kept_rows<D>(tree: &RowTree<D>, visible: &[bool], store: &SelectionStore) -> Vec<usize> {
    (0..tree.len())
        .filter(|&idx| !visible[idx] && reports_selected(tree, store, idx))
        .collect()
}

/// Whether the row counts as selected when listing selected rows.
///
/// Inferring parents are represented by their children, so a stale own entry is
/// never reported.
pub(crate) fn reports_selected<D>(tree: &RowTree<D>, store: &SelectionStore, idx: usize) -> bool {
    is_source(tree, idx) && store.is_selected(tree.row(idx).id())
}

/// Header tri-state over visible top-level rows, counting kept rows as checked.
pub(crate) fn header_state<D>(
    tree: &RowTree<D>,
    visible: &[bool],
    states: &[SelectionState],
    kept_count: usize,
) -> SelectionState {
    let mut tally = Tally::default();
    for &idx in tree.roots() {
        if visible[idx] && tree.row(idx).selectable {
            tally.add(states[idx]);
        }
    }
    tally.add_checked(kept_count);
    tally.state().unwrap_or_default()
}
