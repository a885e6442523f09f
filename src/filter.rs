use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::columns::ColumnSet;
use crate::tree::{RowTree, TableRow};
use crate::value::FilterTerm;

/// Free-text filter split into whitespace-separated terms.
///
/// A row matches when every term matches at least one of its column values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterQuery {
    text: String,
    terms: SmallVec<[FilterTerm; 4]>,
}

impl FilterQuery {
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            terms: text.split_whitespace().map(FilterTerm::new).collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// `true` when the query has no terms and hides nothing.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Tests the row's own column values, ignoring descendants.
    pub fn row_matches<D>(&self, columns: &ColumnSet<D>, row: &TableRow<D>) -> bool {
        if self.is_empty() || row.pin().is_some_and(|pin| !pin.filterable) {
            return true;
        }
        self.terms.iter().all(|term| {
            columns
                .iter()
                .any(|column| column.filter_value_of(row.data()).matches_term(term))
        })
    }
}

/// Visibility of every row of `tree`, indexed like the arena.
///
/// A row is visible when it matches or any descendant does. Deleted rows hide their
/// whole subtree.
pub(crate) fn compute_visibility<D>(
    tree: &RowTree<D>,
    columns: &ColumnSet<D>,
    query: &FilterQuery,
    deleted: &FxHashSet<String>,
) -> Vec<bool> {
    let rows = tree.rows();

    // Pre-order: parents are resolved before their children.
    let mut removed = vec![false; rows.len()];
    if !deleted.is_empty() {
        for (idx, row) in rows.iter().enumerate() {
            removed[idx] = deleted.contains(row.id()) || row.parent.is_some_and(|p| removed[p]);
        }
    }

    // Reverse pre-order: children are resolved before their parents.
    let mut visible = vec![false; rows.len()];
    for idx in (0..rows.len()).rev() {
        if removed[idx] {
            continue;
        }
        let row = &rows[idx];
        visible[idx] = row.children.iter().any(|&child| visible[child])
            || query.row_matches(columns, row);
    }
    visible
}
