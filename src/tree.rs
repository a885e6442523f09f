use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

use crate::error::TableError;
use crate::row::{HEADER_ID, KEPT_GROUP_ID, Row, RowPin};

/// Children index list. Most rows have only a handful of children.
pub(crate) type ChildList = SmallVec<[usize; 4]>;

/// One row of the arena, with its hierarchy links resolved to indices.
#[derive(Debug)]
pub struct TableRow<D> {
    pub(crate) id: String,
    pub(crate) kind: String,
    pub(crate) data: D,
    pub(crate) pin: Option<RowPin>,
    pub(crate) selectable: bool,
    pub(crate) infer_selected_state: bool,
    pub(crate) init_collapsed: bool,
    pub(crate) init_selected: bool,
    pub(crate) parent: Option<usize>,
    pub(crate) children: ChildList,
    pub(crate) level: u16,
}

impl<D> TableRow<D> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub const fn data(&self) -> &D {
        &self.data
    }

    pub const fn pin(&self) -> Option<RowPin> {
        self.pin
    }

    pub const fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub const fn infers_selected_state(&self) -> bool {
        self.infer_selected_state
    }

    /// Depth in the hierarchy; top-level rows are at level 0.
    pub const fn level(&self) -> u16 {
        self.level
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Indexed arena built from a nested row list.
///
/// Rows are stored in depth-first pre-order, so a parent always has a smaller
/// index than any of its descendants.
#[derive(Debug)]
pub struct RowTree<D> {
    rows: Vec<TableRow<D>>,
    roots: ChildList,
    index: FxHashMap<String, usize>,
}

impl<D> Default for RowTree<D> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            roots: ChildList::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<D> RowTree<D> {
    /// Flattens and indexes `rows`.
    ///
    /// Fails on the first id that repeats anywhere in the tree, regardless of kind or depth,
    /// and on rows that reuse a reserved synthetic id.
    pub fn build(rows: Vec<Row<D>>) -> Result<Self, TableError> {
        let capacity = count_rows(&rows);
        let mut tree = Self {
            rows: Vec::with_capacity(capacity),
            roots: ChildList::new(),
            index: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        };

        // Explicit stack of (row, parent index); children pushed in reverse keep pre-order.
        let mut stack: Vec<(Row<D>, Option<usize>)> = Vec::with_capacity(rows.len());
        stack.extend(rows.into_iter().rev().map(|row| (row, None)));
        while let Some((row, parent)) = stack.pop() {
            let idx = tree.claim_id(&row.id)?;
            let Row {
                id,
                kind,
                data,
                children,
                pin,
                selectable,
                infer_selected_state,
                init_collapsed,
                init_selected,
            } = row;
            let level = parent.map_or(0, |p| tree.rows[p].level.saturating_add(1));
            tree.rows.push(TableRow {
                id,
                kind,
                data,
                pin,
                selectable,
                infer_selected_state,
                init_collapsed,
                init_selected,
                parent,
                children: ChildList::new(),
                level,
            });
            match parent {
                Some(p) => tree.rows[p].children.push(idx),
                None => tree.roots.push(idx),
            }
            stack.extend(children.into_iter().rev().map(|child| (child, Some(idx))));
        }

        Ok(tree)
    }

    fn claim_id(&mut self, id: &str) -> Result<usize, TableError> {
        if id == HEADER_ID || id == KEPT_GROUP_ID {
            return Err(TableError::ReservedRowId { id: id.to_owned() });
        }
        if self.index.contains_key(id) {
            return Err(TableError::DuplicateRowId { id: id.to_owned() });
        }
        let idx = self.rows.len();
        self.index.insert(id.to_owned(), idx);
        Ok(idx)
    }

    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn rows(&self) -> &[TableRow<D>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> &TableRow<D> {
        &self.rows[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&TableRow<D>> {
        self.index_of(id).map(|idx| &self.rows[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Children of `idx`, or the top-level rows for `None`.
    pub fn children_of(&self, idx: Option<usize>) -> &[usize] {
        idx.map_or(&self.roots, |idx| &self.rows[idx].children)
    }

    /// Indices of every row that has children, at any depth, in pre-order.
    pub fn parent_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| row.has_children().then_some(idx))
    }
}

fn count_rows<D>(rows: &[Row<D>]) -> usize {
    rows.iter().map(|row| 1 + count_rows(&row.children)).sum()
}
