use std::rc::Rc;

use ratatui::layout::Constraint;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::action::{TableAction, TableEvent};
use crate::collapse::CollapseStore;
use crate::column_state::ColumnTracker;
use crate::columns::ColumnSet;
use crate::error::TableError;
use crate::filter::{FilterQuery, compute_visibility};
use crate::memo::{KindMemo, Memo, Observers, SubscriptionId, TableChange, Versions};
use crate::row::{HEADER_ID, KEPT_GROUP_ID, Row};
use crate::scroll::ScrollHost;
use crate::selection::{
    SelectionState, SelectionStore, apply_selection, apply_selection_to_all, derive_states,
    header_state, kept_rows, reports_selected,
};
use crate::sort::{InitialSort, SortMode, SortSpec, SortState, SortedOrder};
use crate::storage::KeyValueStorage;
use crate::tree::{RowTree, TableRow};

#[cfg(feature = "keymap")]
use crate::keymap::TableKeyBindings;
#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

/// Construction options for [`TableState`].
#[derive(Debug, Default)]
pub struct TableOptions {
    /// Persistence key for the collapsed row list.
    pub collapse_storage_key: Option<String>,
    /// Base persistence key for visible columns. Derived from the column ids when unset.
    pub columns_storage_key: Option<String>,
    /// Sort applied on creation and restored by the third click on a column.
    pub initial_sort: InitialSort,
    pub sort_mode: SortMode,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn collapse_storage_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_storage_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn columns_storage_key(mut self, key: impl Into<String>) -> Self {
        self.columns_storage_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn initial_sort(mut self, initial_sort: InitialSort) -> Self {
        self.initial_sort = initial_sort;
        self
    }

    #[must_use]
    pub fn sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }
}

/// Derived per-row flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowState {
    pub level: u16,
    /// Passes the filter (or has a descendant that does) and was not deleted.
    pub is_visible: bool,
    /// Selected but hidden by the filter, listed in the kept group.
    pub is_kept: bool,
    pub is_last_kept_in_group: bool,
    pub selection: SelectionState,
}

/// One line of the flattened list handed to the rendering host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderedRow {
    /// Synthetic group listing selected rows hidden by the filter.
    KeptGroup { count: usize, collapsed: bool },
    /// A row of the tree. `index` addresses [`TableState::tree`].
    Row { index: usize, depth: u16, kept: bool },
}

/// Label of the kept group for `count` hidden selected rows.
pub fn kept_group_label(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} selected row{plural} hidden due to filters")
}

/// Snapshot of user-facing state (collapse, columns, selection, sort, filter).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub collapsed: Vec<String>,
    pub kept_collapsed: bool,
    pub visible_columns: Vec<String>,
    pub expanded_columns: Vec<String>,
    /// Explicitly selected ids as stored, before inference.
    pub selected: Vec<String>,
    pub sort: Option<SortSpec>,
    pub filter: String,
}

type FilterKey = (u64, u64);
type StatesKey = (u64, u64, u64);
type OrderKey = (u64, u64, u64);
type KeptKey = (u64, u64, u64, u64);

/// Table state: row hierarchy, filter, sort, selection, collapse and columns.
///
/// Mutations run to completion, bump the versions they touch and then notify
/// subscribers. Derived queries are memoized against those versions.
pub struct TableState<D> {
    tree: RowTree<D>,
    columns: ColumnSet<D>,
    sort: SortState,
    sort_mode: SortMode,
    // Sibling order for the current tree and sort.
    order: SortedOrder,
    filter: FilterQuery,
    selection: SelectionStore,
    collapse: CollapseStore,
    column_tracker: ColumnTracker,
    kept_collapsed: bool,
    // Hidden with their subtree until the next snapshot.
    deleted: FxHashSet<String>,
    // Row ids whose `init_selected` was already applied.
    seen_rows: FxHashSet<String>,
    active_row_id: Option<String>,
    active_cell_id: Option<String>,
    scroll_host: Option<Box<dyn ScrollHost>>,
    storage: Option<Box<dyn KeyValueStorage>>,
    versions: Versions,
    visibility: Memo<FilterKey, [bool]>,
    states: Memo<StatesKey, [SelectionState]>,
    visible_order: KindMemo<OrderKey, [usize]>,
    full_order: Memo<(u64, u64), [usize]>,
    kept: Memo<KeptKey, [usize]>,
    rendered: Memo<Versions, [RenderedRow]>,
    selected_order: KindMemo<KeptKey, [usize]>,
    selected_ids: KindMemo<KeptKey, [String]>,
    observers: Observers,
    #[cfg(feature = "keymap")]
    keymap: TableKeyBindings,
}

impl<D> TableState<D> {
    /// Creates an empty table without persistence.
    pub fn new(columns: ColumnSet<D>, options: TableOptions) -> Self {
        Self::build(columns, options, None)
    }

    /// Creates an empty table persisting collapse and column state to `storage`.
    pub fn with_storage(
        columns: ColumnSet<D>,
        options: TableOptions,
        storage: impl KeyValueStorage + 'static,
    ) -> Self {
        Self::build(columns, options, Some(Box::new(storage)))
    }

    fn build(
        columns: ColumnSet<D>,
        options: TableOptions,
        storage: Option<Box<dyn KeyValueStorage>>,
    ) -> Self {
        let initial = match options.initial_sort {
            InitialSort::Unsorted => None,
            InitialSort::FirstSortable => columns
                .first_sortable()
                .map(|column| SortSpec::asc(column.id.clone())),
            InitialSort::Spec(spec) => Some(spec),
        };
        let mut column_tracker = ColumnTracker::new();
        column_tracker.sync(
            &columns,
            storage.as_deref(),
            options.columns_storage_key.as_deref(),
        );

        Self {
            tree: RowTree::default(),
            columns,
            sort: SortState::new(initial),
            sort_mode: options.sort_mode,
            order: SortedOrder::default(),
            filter: FilterQuery::default(),
            selection: SelectionStore::new(),
            collapse: CollapseStore::new(options.collapse_storage_key),
            column_tracker,
            kept_collapsed: true,
            deleted: FxHashSet::default(),
            seen_rows: FxHashSet::default(),
            active_row_id: None,
            active_cell_id: None,
            scroll_host: None,
            storage,
            versions: Versions::default(),
            visibility: Memo::default(),
            states: Memo::default(),
            visible_order: KindMemo::default(),
            full_order: Memo::default(),
            kept: Memo::default(),
            rendered: Memo::default(),
            selected_order: KindMemo::default(),
            selected_ids: KindMemo::default(),
            observers: Observers::default(),
            #[cfg(feature = "keymap")]
            keymap: TableKeyBindings::new(),
        }
    }

    #[cfg(feature = "keymap")]
    /// Returns a mutable reference to the key binding set.
    pub const fn keymap_mut(&mut self) -> &mut TableKeyBindings {
        &mut self.keymap
    }

    pub const fn tree(&self) -> &RowTree<D> {
        &self.tree
    }

    pub fn row(&self, id: &str) -> Option<&TableRow<D>> {
        self.tree.get(id)
    }

    pub const fn columns(&self) -> &ColumnSet<D> {
        &self.columns
    }

    /// Replaces the row snapshot.
    ///
    /// Selection of rows missing from the new snapshot is dropped, rows seen for the
    /// first time apply `init_selected` / `init_collapsed`, and deleted rows come back.
    /// On error the previous snapshot stays in place.
    pub fn set_rows(&mut self, rows: Vec<Row<D>>) -> Result<(), TableError> {
        let tree = RowTree::build(rows)?;
        let order = self.sorted_order(&tree)?;
        log::debug!("table snapshot replaced with {} rows", tree.len());

        self.tree = tree;
        self.order = order;
        self.deleted.clear();
        let tree = &self.tree;
        self.selection.retain(|id| tree.contains(id));
        self.collapse.sync(&self.tree, self.storage.as_deref());
        self.apply_initial_selection();
        self.commit(&[TableChange::Rows, TableChange::Selection, TableChange::Collapse]);
        Ok(())
    }

    fn apply_initial_selection(&mut self) {
        let seen = &mut self.seen_rows;
        let fresh: Vec<usize> = self
            .tree
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| seen.insert(row.id().to_owned()) && row.init_selected)
            .map(|(idx, _)| idx)
            .collect();
        if fresh.is_empty() {
            return;
        }
        let visible = compute_visibility(&self.tree, &self.columns, &self.filter, &self.deleted);
        for idx in fresh {
            apply_selection(&mut self.selection, &self.tree, &visible, idx, true);
        }
    }

    /// Replaces the column definitions, applying initial flags to new column ids.
    pub fn set_columns(&mut self, columns: ColumnSet<D>) -> Result<(), TableError> {
        let previous = std::mem::replace(&mut self.columns, columns);
        match self.sorted_order(&self.tree) {
            Ok(order) => self.order = order,
            Err(err) => {
                self.columns = previous;
                return Err(err);
            }
        }
        self.column_tracker
            .sync(&self.columns, self.storage.as_deref(), None);
        self.commit(&[TableChange::Columns, TableChange::Filter, TableChange::Sort]);
        Ok(())
    }

    pub fn filter_text(&self) -> &str {
        self.filter.text()
    }

    /// Sets the free-text filter. Whitespace separates terms that must all match.
    pub fn set_filter_text(&mut self, text: &str) {
        if self.filter.text() == text {
            return;
        }
        self.filter = FilterQuery::parse(text);
        self.commit(&[TableChange::Filter]);
    }

    // Sort

    pub const fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.active()
    }

    /// Advances the three-state sort cycle of `key`.
    ///
    /// Unknown and non-sortable columns are ignored. On a client-sort error the
    /// previous sort stays active.
    pub fn toggle_sort(&mut self, key: &str) -> Result<(), TableError> {
        if !self.columns.column(key).is_some_and(|column| column.sortable) {
            log::debug!("sort toggle on non-sortable column `{key}` ignored");
            return Ok(());
        }
        let previous = self.sort.clone();
        self.sort.toggle(key);
        self.apply_sort(previous)
    }

    /// Sets the active sort directly; `None` leaves rows in supplied order.
    pub fn set_sort(&mut self, spec: Option<SortSpec>) -> Result<(), TableError> {
        let previous = self.sort.clone();
        self.sort.set(spec);
        self.apply_sort(previous)
    }

    /// Re-runs the client sort, reading every sort value again.
    pub fn resort(&mut self) -> Result<(), TableError> {
        self.order = self.sorted_order(&self.tree)?;
        self.commit(&[TableChange::Sort]);
        Ok(())
    }

    fn apply_sort(&mut self, previous: SortState) -> Result<(), TableError> {
        match self.sorted_order(&self.tree) {
            Ok(order) => self.order = order,
            Err(err) => {
                self.sort = previous;
                return Err(err);
            }
        }
        if let SortMode::Server { on_sort } = &mut self.sort_mode {
            on_sort(self.sort.active());
        }
        self.commit(&[TableChange::Sort]);
        Ok(())
    }

    fn sorted_order(&self, tree: &RowTree<D>) -> Result<SortedOrder, TableError> {
        match self.sort_mode {
            SortMode::Client => SortedOrder::client(tree, &self.columns, self.sort.active()),
            // Rows arrive in server order.
            SortMode::Server { .. } => Ok(SortedOrder::unsorted(tree)),
        }
    }

    // Selection

    /// Selects or deselects a row.
    ///
    /// [`HEADER_ID`] applies to every visible row and every kept row; [`KEPT_GROUP_ID`]
    /// applies to the kept rows only. Unknown ids are ignored.
    pub fn select_row(&mut self, id: &str, selected: bool) {
        let visible = self.visibility();
        if id == HEADER_ID {
            let kept = self.kept_indices();
            apply_selection_to_all(&mut self.selection, &self.tree, &visible, &kept, selected);
        } else if id == KEPT_GROUP_ID {
            for &idx in self.kept_indices().iter() {
                self.selection.set(self.tree.row(idx).id(), selected);
            }
        } else if let Some(idx) = self.tree.index_of(id) {
            apply_selection(&mut self.selection, &self.tree, &visible, idx, selected);
        } else {
            log::debug!("selection of unknown row `{id}` ignored");
            return;
        }
        self.commit(&[TableChange::Selection]);
    }

    pub fn clear_selections(&mut self) {
        self.selection.clear();
        self.commit(&[TableChange::Selection]);
    }

    /// Indices of selected rows of `kind` (any kind for `None`) in sorted tree order,
    /// including rows kept while hidden by the filter.
    ///
    /// Parents that infer their state are represented by their children.
    pub fn selected_row_indices(&self, kind: Option<&str>) -> Rc<[usize]> {
        let order = self.full_order();
        self.selected_order.get_or_compute(kind, self.kept_key(), || {
            log::trace!("recomputing selected rows");
            order
                .iter()
                .copied()
                .filter(|&idx| {
                    Self::is_kind(self.tree.row(idx), kind)
                        && reports_selected(&self.tree, &self.selection, idx)
                })
                .collect::<Vec<_>>()
                .into()
        })
    }

    /// Ids for [`Self::selected_row_indices`].
    pub fn selected_row_ids(&self, kind: Option<&str>) -> Rc<[String]> {
        let indices = self.selected_row_indices(kind);
        self.selected_ids.get_or_compute(kind, self.kept_key(), || {
            indices
                .iter()
                .map(|&idx| self.tree.row(idx).id().to_owned())
                .collect::<Vec<_>>()
                .into()
        })
    }

    pub fn selected_rows(&self, kind: Option<&str>) -> Vec<&TableRow<D>> {
        self.selected_row_indices(kind)
            .iter()
            .map(|&idx| self.tree.row(idx))
            .collect()
    }

    /// Tri-state of the header checkbox, counting kept rows as selected.
    pub fn header_selection(&self) -> SelectionState {
        let visible = self.visibility();
        let states = self.selection_states();
        header_state(&self.tree, &visible, &states, self.kept_indices().len())
    }

    // Collapse

    pub fn is_collapsed_row(&self, id: &str) -> bool {
        if id == KEPT_GROUP_ID {
            self.kept_collapsed
        } else {
            self.collapse.is_collapsed(id)
        }
    }

    /// Toggles a row, every level for [`HEADER_ID`], or the kept group.
    pub fn toggle_collapsed_row(&mut self, id: &str) {
        if id == KEPT_GROUP_ID {
            self.kept_collapsed = !self.kept_collapsed;
        } else if !self.collapse.toggle(&self.tree, id, self.storage.as_deref()) {
            return;
        }
        self.commit(&[TableChange::Collapse]);
    }

    /// Collapsed row ids in the order they were collapsed.
    pub fn collapsed_row_ids(&self) -> Vec<&str> {
        self.collapse.ids().collect()
    }

    // Focus

    pub fn active_row_id(&self) -> Option<&str> {
        self.active_row_id.as_deref()
    }

    pub fn active_cell_id(&self) -> Option<&str> {
        self.active_cell_id.as_deref()
    }

    pub fn set_active_row_id(&mut self, id: Option<&str>) {
        self.active_row_id = id.map(str::to_owned);
        self.commit(&[TableChange::Focus]);
    }

    pub fn set_active_cell_id(&mut self, id: Option<&str>) {
        self.active_cell_id = id.map(str::to_owned);
        self.commit(&[TableChange::Focus]);
    }

    /// Hides rows (and their subtrees) and forgets their selection until the next
    /// snapshot, so the host can drop them later.
    pub fn delete_rows<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for id in ids {
            let id = id.as_ref();
            let Some(idx) = self.tree.index_of(id) else {
                log::debug!("delete of unknown row `{id}` ignored");
                continue;
            };
            let mut stack = vec![idx];
            while let Some(idx) = stack.pop() {
                let row = self.tree.row(idx);
                self.selection.remove(row.id());
                stack.extend(row.children.iter().copied());
            }
            changed |= self.deleted.insert(id.to_owned());
        }
        if changed {
            self.commit(&[TableChange::Rows, TableChange::Selection]);
        }
    }

    // Columns

    /// Visible column ids in declaration order.
    pub fn visible_column_ids(&self) -> Vec<&str> {
        self.column_tracker.visible_ids(&self.columns)
    }

    pub fn set_visible_columns<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_tracker
            .set_visible(ids, self.storage.as_deref());
        self.commit(&[TableChange::Columns]);
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool) {
        self.column_tracker
            .set_column_visible(id, visible, self.storage.as_deref());
        self.commit(&[TableChange::Columns]);
    }

    pub fn expanded_column_ids(&self) -> Vec<&str> {
        self.column_tracker.expanded_ids(&self.columns)
    }

    pub fn is_column_expanded(&self, id: &str) -> bool {
        self.column_tracker.is_expanded(id)
    }

    pub fn toggle_expanded_column(&mut self, id: &str) {
        self.column_tracker
            .toggle_expanded(id, self.storage.as_deref());
        self.commit(&[TableChange::Columns]);
    }

    /// Width constraints for the visible columns within `width` cells.
    pub fn visible_constraints(&self, width: u16) -> SmallVec<[Constraint; 8]> {
        self.columns
            .constraints_for_width(width, self.visible_column_ids())
    }

    // Scrolling

    pub fn attach_scroll_host(&mut self, host: impl ScrollHost + 'static) {
        self.scroll_host = Some(Box::new(host));
    }

    pub fn detach_scroll_host(&mut self) -> Option<Box<dyn ScrollHost>> {
        self.scroll_host.take()
    }

    /// Asks the scroll host to bring a rendered row into view. No-op without a host.
    pub fn scroll_to_index(&mut self, index: usize) {
        if let Some(host) = self.scroll_host.as_mut() {
            host.scroll_to_index(index);
        }
    }

    // Observers

    /// Registers a listener called after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(TableChange) + 'static) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn commit(&mut self, changes: &[TableChange]) {
        for &change in changes {
            self.versions.bump(change);
        }
        // An emptied kept group starts collapsed when it reappears.
        if !self.kept_collapsed && self.kept_indices().is_empty() {
            self.kept_collapsed = true;
            self.versions.bump(TableChange::Collapse);
        }
        for &change in changes {
            self.observers.notify(change);
        }
    }

    // Derived queries

    const fn kept_key(&self) -> KeptKey {
        let v = self.versions;
        (v.rows, v.filter, v.selection, v.sort)
    }

    fn visibility(&self) -> Rc<[bool]> {
        let key = (self.versions.rows, self.versions.filter);
        self.visibility.get_or_compute(key, || {
            log::trace!("recomputing row visibility");
            compute_visibility(&self.tree, &self.columns, &self.filter, &self.deleted).into()
        })
    }

    fn selection_states(&self) -> Rc<[SelectionState]> {
        let v = self.versions;
        let visible = self.visibility();
        self.states
            .get_or_compute((v.rows, v.filter, v.selection), || {
                log::trace!("recomputing selection states");
                derive_states(&self.tree, &visible, &self.selection).into()
            })
    }

    fn kept_indices(&self) -> Rc<[usize]> {
        let visible = self.visibility();
        self.kept.get_or_compute(self.kept_key(), || {
            log::trace!("recomputing kept rows");
            let mut kept = kept_rows(&self.tree, &visible, &self.selection);
            self.order.sort_flat(&mut kept);
            kept.into()
        })
    }

    fn full_order(&self) -> Rc<[usize]> {
        let key = (self.versions.rows, self.versions.sort);
        self.full_order.get_or_compute(key, || {
            log::trace!("recomputing row order");
            self.walk(|_| true, |_| true).into()
        })
    }

    /// Rows of `kind` (any kind for `None`) visible under the filter in sorted tree
    /// order, including rows under collapsed parents.
    pub fn visible_row_indices(&self, kind: Option<&str>) -> Rc<[usize]> {
        let v = self.versions;
        let visible = self.visibility();
        self.visible_order
            .get_or_compute(kind, (v.rows, v.filter, v.sort), || {
                log::trace!("recomputing visible rows");
                self.walk(|idx| visible[idx], |_| true)
                    .into_iter()
                    .filter(|&idx| Self::is_kind(self.tree.row(idx), kind))
                    .collect::<Vec<_>>()
                    .into()
            })
    }

    /// Rows for [`Self::visible_row_indices`].
    pub fn visible_rows(&self, kind: Option<&str>) -> Vec<&TableRow<D>> {
        self.visible_row_indices(kind)
            .iter()
            .map(|&idx| self.tree.row(idx))
            .collect()
    }

    /// Ordered, flattened rows for the rendering host: the kept group (and its
    /// members when expanded) first, then the visible rows outside collapsed parents.
    pub fn rendered_rows(&self) -> Rc<[RenderedRow]> {
        let visible = self.visibility();
        let kept = self.kept_indices();
        self.rendered.get_or_compute(self.versions, || {
            log::trace!("recomputing rendered rows");
            let mut rendered = Vec::with_capacity(kept.len() + 1);
            if !kept.is_empty() {
                rendered.push(RenderedRow::KeptGroup {
                    count: kept.len(),
                    collapsed: self.kept_collapsed,
                });
                if !self.kept_collapsed {
                    rendered.extend(kept.iter().map(|&index| RenderedRow::Row {
                        index,
                        depth: 1,
                        kept: true,
                    }));
                }
            }
            let body = self.walk(
                |idx| visible[idx],
                |idx| !self.collapse.is_collapsed(self.tree.row(idx).id()),
            );
            rendered.extend(body.into_iter().map(|index| RenderedRow::Row {
                index,
                depth: self.tree.row(index).level(),
                kept: false,
            }));
            rendered.into()
        })
    }

    /// Id of a rendered row; the kept group reports [`KEPT_GROUP_ID`].
    pub fn rendered_row_id(&self, row: &RenderedRow) -> &str {
        match *row {
            RenderedRow::KeptGroup { .. } => KEPT_GROUP_ID,
            RenderedRow::Row { index, .. } => self.tree.row(index).id(),
        }
    }

    /// Derived flags for one row, `None` for unknown ids.
    pub fn row_state(&self, id: &str) -> Option<RowState> {
        let idx = self.tree.index_of(id)?;
        let visible = self.visibility();
        let kept = self.kept_indices();
        let is_kept = !visible[idx] && kept.contains(&idx);
        let selection = if is_kept {
            SelectionState::Checked
        } else {
            self.selection_states()[idx]
        };
        Some(RowState {
            level: self.tree.row(idx).level(),
            is_visible: visible[idx],
            is_kept,
            is_last_kept_in_group: is_kept && kept.last() == Some(&idx),
            selection,
        })
    }

    /// Pre-order walk over sorted siblings, keeping rows that pass `include` and
    /// descending where `descend` allows.
    fn walk(
        &self,
        include: impl Fn(usize) -> bool,
        descend: impl Fn(usize) -> bool,
    ) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.tree.len());
        let mut stack: Vec<usize> = self
            .order
            .children_of(None)
            .iter()
            .rev()
            .copied()
            .filter(|&idx| include(idx))
            .collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            if descend(idx) {
                stack.extend(
                    self.order
                        .children_of(Some(idx))
                        .iter()
                        .rev()
                        .copied()
                        .filter(|&child| include(child)),
                );
            }
        }
        out
    }

    fn is_kind(row: &TableRow<D>, kind: Option<&str>) -> bool {
        kind.is_none_or(|kind| row.kind() == kind)
    }

    // Snapshot

    /// Captures a snapshot of the current state for persistence or restore.
    pub fn snapshot(&self) -> TableSnapshot {
        let mut selected: Vec<String> = self.selection.selected_ids().map(str::to_owned).collect();
        selected.sort_unstable();
        TableSnapshot {
            collapsed: self.collapse.ids().map(str::to_owned).collect(),
            kept_collapsed: self.kept_collapsed,
            visible_columns: self.visible_column_ids().into_iter().map(str::to_owned).collect(),
            expanded_columns: self.expanded_column_ids().into_iter().map(str::to_owned).collect(),
            selected,
            sort: self.sort.active().cloned(),
            filter: self.filter.text().to_owned(),
        }
    }

    /// Restores state from a previously captured snapshot.
    ///
    /// Fails only when the restored sort cannot be applied; the rest is restored anyway.
    pub fn restore(&mut self, snapshot: TableSnapshot) -> Result<(), TableError> {
        let storage = self.storage.as_deref();
        self.collapse.set(snapshot.collapsed, storage);
        self.column_tracker.set_visible(snapshot.visible_columns, storage);
        self.column_tracker.set_expanded(snapshot.expanded_columns, storage);
        self.selection.clear();
        for id in &snapshot.selected {
            self.selection.set(id, true);
        }
        self.filter = FilterQuery::parse(&snapshot.filter);
        self.kept_collapsed = snapshot.kept_collapsed;
        self.commit(&[
            TableChange::Collapse,
            TableChange::Columns,
            TableChange::Selection,
            TableChange::Filter,
        ]);
        if self.sort.active() == snapshot.sort.as_ref() {
            return Ok(());
        }
        self.set_sort(snapshot.sort)
    }

    // Actions

    /// Handles a table action and returns the resulting event.
    pub fn handle_action<C>(
        &mut self,
        action: TableAction<C>,
    ) -> Result<TableEvent<C>, TableError> {
        let handled = match action {
            TableAction::Custom(_) => return Ok(TableEvent::Action(action)),
            TableAction::ToggleSelect => self.toggle_active_selection(),
            TableAction::SelectAll => {
                let select = !self.header_selection().is_checked();
                self.select_row(HEADER_ID, select);
                true
            }
            TableAction::ClearSelection => {
                self.clear_selections();
                true
            }
            TableAction::ToggleCollapse => self.toggle_active_collapse(),
            TableAction::CollapseAll => {
                self.toggle_collapsed_row(HEADER_ID);
                true
            }
            TableAction::ToggleSort(key) => {
                self.toggle_sort(&key)?;
                true
            }
            TableAction::ToggleSortAt(position) => {
                let key = self
                    .visible_column_ids()
                    .get(position)
                    .map(|id| (*id).to_owned());
                match key {
                    Some(key) => {
                        self.toggle_sort(&key)?;
                        true
                    }
                    None => false,
                }
            }
            TableAction::ActivatePrev => self.activate_by(|current, _| {
                current.map_or(0, |idx| idx.saturating_sub(1))
            }),
            TableAction::ActivateNext => self.activate_by(|current, len| {
                current.map_or(0, |idx| (idx + 1).min(len - 1))
            }),
            TableAction::ActivateFirst => self.activate_by(|_, _| 0),
            TableAction::ActivateLast => self.activate_by(|_, len| len - 1),
        };
        Ok(if handled {
            TableEvent::Handled
        } else {
            TableEvent::Unhandled
        })
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event into an action and handles it.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<TableEvent<()>, TableError> {
        let Some(action) = self.keymap.resolve(key) else {
            return Ok(TableEvent::Unhandled);
        };
        self.handle_action(action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event with a custom mapping and handles it.
    pub fn handle_key_with<C, F>(
        &mut self,
        key: KeyEvent,
        custom: F,
    ) -> Result<TableEvent<C>, TableError>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        let Some(action) = self.keymap.resolve_with(key, custom) else {
            return Ok(TableEvent::Unhandled);
        };
        self.handle_action(action)
    }

    fn toggle_active_selection(&mut self) -> bool {
        let Some(id) = self.active_row_id.clone() else {
            return false;
        };
        if id == KEPT_GROUP_ID {
            if self.kept_indices().is_empty() {
                return false;
            }
            self.select_row(KEPT_GROUP_ID, false);
            return true;
        }
        if !self.tree.get(&id).is_some_and(TableRow::is_selectable) {
            return false;
        }
        let Some(state) = self.row_state(&id) else {
            return false;
        };
        self.select_row(&id, !state.selection.is_checked());
        true
    }

    fn toggle_active_collapse(&mut self) -> bool {
        let Some(id) = self.active_row_id.clone() else {
            return false;
        };
        let collapsible = id == KEPT_GROUP_ID
            || self.tree.get(&id).is_some_and(TableRow::has_children);
        if collapsible {
            self.toggle_collapsed_row(&id);
        }
        collapsible
    }

    fn activate_by(&mut self, target: impl Fn(Option<usize>, usize) -> usize) -> bool {
        let rendered = self.rendered_rows();
        if rendered.is_empty() {
            return false;
        }
        let current = self.active_row_id.as_deref().and_then(|active| {
            rendered
                .iter()
                .position(|row| self.rendered_row_id(row) == active)
        });
        let next = target(current, rendered.len()).min(rendered.len() - 1);
        let id = self.rendered_row_id(&rendered[next]).to_owned();
        self.set_active_row_id(Some(&id));
        self.scroll_to_index(next);
        true
    }
}
