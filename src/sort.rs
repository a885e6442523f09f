use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::columns::ColumnSet;
use crate::error::TableError;
use crate::row::PinPosition;
use crate::tree::{ChildList, RowTree};
use crate::value::SortKey;

/// Sort direction for columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sort applied when the table is created and restored after the third click.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitialSort {
    /// Rows keep the order they were supplied in.
    #[default]
    Unsorted,
    /// First sortable column, ascending.
    FirstSortable,
    Spec(SortSpec),
}

/// Who orders the rows.
#[derive(Default)]
pub enum SortMode {
    /// The table sorts rows in memory.
    #[default]
    Client,
    /// Rows arrive already ordered; the callback receives every sort change.
    Server {
        on_sort: Box<dyn FnMut(Option<&SortSpec>)>,
    },
}

impl SortMode {
    pub fn server(on_sort: impl FnMut(Option<&SortSpec>) + 'static) -> Self {
        Self::Server {
            on_sort: Box::new(on_sort),
        }
    }

    pub const fn is_client(&self) -> bool {
        matches!(self, Self::Client)
    }
}

impl fmt::Debug for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("Client"),
            Self::Server { .. } => f.write_str("Server"),
        }
    }
}

/// Three-state sort cycle per column: ASC, DESC, then back to the initial sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    active: Option<SortSpec>,
    initial: Option<SortSpec>,
}

impl SortState {
    pub fn new(initial: Option<SortSpec>) -> Self {
        Self {
            active: initial.clone(),
            initial,
        }
    }

    pub const fn active(&self) -> Option<&SortSpec> {
        self.active.as_ref()
    }

    pub const fn initial(&self) -> Option<&SortSpec> {
        self.initial.as_ref()
    }

    pub fn set(&mut self, spec: Option<SortSpec>) {
        self.active = spec;
    }

    /// Advances the cycle for a click on `key`.
    ///
    /// A column other than the active one always starts at ascending.
    pub fn toggle(&mut self, key: &str) -> Option<&SortSpec> {
        self.active = match self.active.take() {
            Some(SortSpec {
                key: active,
                direction: SortDirection::Asc,
            }) if active == key => Some(SortSpec::desc(active)),
            Some(SortSpec {
                key: active,
                direction: SortDirection::Desc,
            }) if active == key => self.initial.clone(),
            _ => Some(SortSpec::asc(key)),
        };
        self.active.as_ref()
    }
}

/// Row order produced by a sort pass: per-parent sibling order plus the keys used.
#[derive(Debug, Clone, Default)]
pub(crate) struct SortedOrder {
    pub(crate) roots: ChildList,
    pub(crate) children: Vec<ChildList>,
    keys: Vec<SortKey>,
    direction: SortDirection,
}

impl SortedOrder {
    /// Supplied order with pinned rows moved to the edges of their groups.
    pub(crate) fn unsorted<D>(tree: &RowTree<D>) -> Self {
        let mut order = Self {
            roots: ChildList::new(),
            children: Vec::with_capacity(tree.len()),
            keys: Vec::new(),
            direction: SortDirection::Asc,
        };
        order.roots = order.arrange(tree, tree.roots());
        for row in tree.rows() {
            let arranged = order.arrange(tree, &row.children);
            order.children.push(arranged);
        }
        order
    }

    /// Sorts every sibling group independently by `spec`.
    ///
    /// Values are read from the rows on every call. Columns that opt out of client sort
    /// leave the supplied order untouched.
    pub(crate) fn client<D>(
        tree: &RowTree<D>,
        columns: &ColumnSet<D>,
        spec: Option<&SortSpec>,
    ) -> Result<Self, TableError> {
        let Some(spec) = spec else {
            return Ok(Self::unsorted(tree));
        };
        let Some(column) = columns.column(&spec.key) else {
            log::debug!("sort on unknown column `{}` ignored", spec.key);
            return Ok(Self::unsorted(tree));
        };
        if !column.client_sort {
            return Ok(Self::unsorted(tree));
        }

        let keys = tree
            .rows()
            .iter()
            .map(|row| {
                column
                    .sort_value_of(row.data())
                    .sort_key()
                    .ok_or_else(|| TableError::UnsortableValue {
                        column: column.id.clone(),
                        row: row.id().to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut order = Self {
            keys,
            direction: spec.direction,
            ..Self::default()
        };
        order.roots = order.arrange(tree, tree.roots());
        order.children.reserve(tree.len());
        for row in tree.rows() {
            let arranged = order.arrange(tree, &row.children);
            order.children.push(arranged);
        }
        Ok(order)
    }

    pub(crate) fn children_of(&self, idx: Option<usize>) -> &[usize] {
        idx.map_or(&self.roots, |idx| &self.children[idx])
    }

    /// Orders an arbitrary set of rows (not siblings) with the same comparator.
    pub(crate) fn sort_flat(&self, rows: &mut [usize]) {
        rows.sort_by(|&a, &b| self.compare(a, b).then(a.cmp(&b)));
    }

    fn arrange<D>(&self, tree: &RowTree<D>, siblings: &[usize]) -> ChildList {
        let mut first = ChildList::new();
        let mut middle = ChildList::new();
        let mut last = ChildList::new();
        for &idx in siblings {
            match tree.row(idx).pin().map(|pin| pin.at) {
                Some(PinPosition::First) => first.push(idx),
                Some(PinPosition::Last) => last.push(idx),
                None => middle.push(idx),
            }
        }
        if !self.keys.is_empty() {
            // Stable, so equal keys keep their supplied order in both directions.
            middle.sort_by(|&a, &b| self.compare(a, b));
        }
        first.extend(middle);
        first.extend(last);
        first
    }

    fn compare(&self, a: usize, b: usize) -> Ordering {
        let (Some(a), Some(b)) = (self.keys.get(a), self.keys.get(b)) else {
            return Ordering::Equal;
        };
        match (a, b) {
            (SortKey::Null, SortKey::Null) => Ordering::Equal,
            (SortKey::Null, _) => Ordering::Less,
            (_, SortKey::Null) => Ordering::Greater,
            _ => match self.direction {
                SortDirection::Asc => a.cmp_defined(b),
                SortDirection::Desc => a.cmp_defined(b).reverse(),
            },
        }
    }
}
