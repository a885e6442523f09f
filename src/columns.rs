use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use ratatui::layout::Constraint;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::value::CellValue;

/// Extracts a cell value from row data.
pub type ValueFn<D> = Rc<dyn Fn(&D) -> CellValue>;

/// Builds a column definition for a key that has no explicit definition.
pub type ColumnFallback<D> = Rc<dyn Fn(&str) -> Column<D>>;

/// Width constraints for a column in adaptive layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnWidth {
    /// Minimum width.
    pub min: u16,
    /// Ideal width (used before expanding toward max).
    pub ideal: u16,
    /// Maximum width.
    pub max: u16,
}

impl ColumnWidth {
    /// Creates a fixed width (min = ideal = max).
    pub const fn fixed(width: u16) -> Self {
        Self {
            min: width,
            ideal: width,
            max: width,
        }
    }
}

impl Default for ColumnWidth {
    fn default() -> Self {
        Self {
            min: 4,
            ideal: 12,
            max: 32,
        }
    }
}

/// Column definition: identity, layout, and value extraction for sort and filter.
///
/// Values are looked up in order: sort value (sorting only), value, then rendered content.
pub struct Column<D> {
    pub id: String,
    pub header: String,
    pub width: ColumnWidth,
    pub sortable: bool,
    /// When `false`, the column can be toggled but rows are never reordered by it on the client.
    pub client_sort: bool,
    pub init_visible: bool,
    pub init_expanded: bool,
    sort_value: Option<ValueFn<D>>,
    value: Option<ValueFn<D>>,
    content: Option<ValueFn<D>>,
}

impl<D> Clone for Column<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            header: self.header.clone(),
            width: self.width,
            sortable: self.sortable,
            client_sort: self.client_sort,
            init_visible: self.init_visible,
            init_expanded: self.init_expanded,
            sort_value: self.sort_value.clone(),
            value: self.value.clone(),
            content: self.content.clone(),
        }
    }
}

impl<D> fmt::Debug for Column<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("width", &self.width)
            .field("sortable", &self.sortable)
            .field("client_sort", &self.client_sort)
            .finish_non_exhaustive()
    }
}

impl<D> Column<D> {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            header: id.clone(),
            id,
            width: ColumnWidth::default(),
            sortable: true,
            client_sort: true,
            init_visible: true,
            init_expanded: false,
            sort_value: None,
            value: None,
            content: None,
        }
    }

    #[must_use]
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    #[must_use]
    pub const fn width(mut self, width: ColumnWidth) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub const fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    #[must_use]
    pub const fn client_sort(mut self, enabled: bool) -> Self {
        self.client_sort = enabled;
        self
    }

    #[must_use]
    pub const fn init_visible(mut self, visible: bool) -> Self {
        self.init_visible = visible;
        self
    }

    #[must_use]
    pub const fn init_expanded(mut self, expanded: bool) -> Self {
        self.init_expanded = expanded;
        self
    }

    #[must_use]
    pub fn sort_value(mut self, f: impl Fn(&D) -> CellValue + 'static) -> Self {
        self.sort_value = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn value(mut self, f: impl Fn(&D) -> CellValue + 'static) -> Self {
        self.value = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn content(mut self, f: impl Fn(&D) -> CellValue + 'static) -> Self {
        self.content = Some(Rc::new(f));
        self
    }

    /// Value used for ordering rows.
    pub fn sort_value_of(&self, data: &D) -> CellValue {
        self.sort_value
            .as_ref()
            .or(self.value.as_ref())
            .or(self.content.as_ref())
            .map_or(CellValue::Null, |f| f(data))
    }

    /// Value used for text filtering.
    pub fn filter_value_of(&self, data: &D) -> CellValue {
        self.value
            .as_ref()
            .or(self.content.as_ref())
            .map_or(CellValue::Null, |f| f(data))
    }
}

/// Ordered column definitions with an optional fallback for undeclared keys.
pub struct ColumnSet<D> {
    columns: Vec<Column<D>>,
    index: FxHashMap<String, usize>,
    fallback: Option<ColumnFallback<D>>,
}

impl<D> Default for ColumnSet<D> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<D> ColumnSet<D> {
    pub fn new(columns: Vec<Column<D>>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.id.clone(), idx))
            .collect();
        Self {
            columns,
            index,
            fallback: None,
        }
    }

    /// Sets the builder used for keys that are not declared.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Fn(&str) -> Column<D> + 'static) -> Self {
        self.fallback = Some(Rc::new(fallback));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<D>> {
        self.columns.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.id.as_str())
    }

    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Declared column for `key`, without consulting the fallback.
    pub fn declared(&self, key: &str) -> Option<&Column<D>> {
        self.index.get(key).map(|&idx| &self.columns[idx])
    }

    /// Declared column for `key`, or one built by the fallback.
    pub fn column(&self, key: &str) -> Option<Cow<'_, Column<D>>> {
        if let Some(column) = self.declared(key) {
            return Some(Cow::Borrowed(column));
        }
        self.fallback.as_ref().map(|build| {
            let mut column = build(key);
            column.id = key.to_owned();
            Cow::Owned(column)
        })
    }

    /// First declared column that can be sorted.
    pub fn first_sortable(&self) -> Option<&Column<D>> {
        self.columns.iter().find(|column| column.sortable)
    }

    /// Storage base key derived from the concatenation of all column ids.
    pub fn derived_storage_key(&self) -> String {
        self.columns.iter().map(|column| column.id.as_str()).collect()
    }

    /// Width constraints for the columns in `visible`, in declaration order.
    pub fn constraints_for_width<'a>(
        &self,
        total: u16,
        visible: impl IntoIterator<Item = &'a str>,
    ) -> SmallVec<[Constraint; 8]> {
        let visible: SmallVec<[&str; 8]> = visible.into_iter().collect();
        let widths: SmallVec<[ColumnWidth; 8]> = self
            .columns
            .iter()
            .filter(|column| visible.contains(&column.id.as_str()))
            .map(|column| column.width)
            .collect();
        distribute_widths(total, &widths)
            .into_iter()
            .map(Constraint::Length)
            .collect()
    }
}

impl<D> Clone for ColumnSet<D> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            index: self.index.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<D> fmt::Debug for ColumnSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSet")
            .field("columns", &self.columns)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Distributes `total` width across columns respecting `min`/`ideal`/`max`.
///
/// If `total` is outside the feasible range (`sum(min)`..=`sum(max)`), the returned widths are
/// clamped to `min` or `max` respectively (so the sum may differ from `total`).
pub fn distribute_widths(total: u16, columns: &[ColumnWidth]) -> SmallVec<[u16; 8]> {
    let mut widths: SmallVec<[u16; 8]> = columns.iter().map(|col| col.min).collect();
    let min_sum = columns
        .iter()
        .fold(0_u16, |sum, col| sum.saturating_add(col.min));

    let mut remaining = total.saturating_sub(min_sum);
    // Grow toward ideal widths first, then toward max.
    for target in [
        (|col: &ColumnWidth| col.ideal.max(col.min)) as fn(&ColumnWidth) -> u16,
        |col: &ColumnWidth| col.max,
    ] {
        for (width, col) in widths.iter_mut().zip(columns) {
            if remaining == 0 {
                return widths;
            }
            let add = target(col).saturating_sub(*width).min(remaining);
            *width = width.saturating_add(add);
            remaining -= add;
        }
    }

    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        name: &'static str,
        size: f64,
    }

    #[test]
    fn distribute_widths_respects_min_ideal_max() {
        let columns = [
            ColumnWidth {
                min: 4,
                ideal: 6,
                max: 8,
            },
            ColumnWidth {
                min: 4,
                ideal: 4,
                max: 6,
            },
        ];
        let widths = distribute_widths(12, &columns);
        assert_eq!(widths.as_slice(), &[8, 4]);
    }

    #[test]
    fn constraints_skip_hidden_columns() {
        let set: ColumnSet<Item> = ColumnSet::new(vec![
            Column::new("name").width(ColumnWidth::fixed(10)),
            Column::new("size").width(ColumnWidth::fixed(6)),
            Column::new("owner").width(ColumnWidth::fixed(8)),
        ]);

        let constraints = set.constraints_for_width(40, ["owner", "name"]);
        assert_eq!(
            constraints.as_slice(),
            &[Constraint::Length(10), Constraint::Length(8)]
        );
    }

    #[test]
    fn value_lookup_order() {
        let column = Column::new("name")
            .content(|item: &Item| CellValue::Content(Some(item.name.to_uppercase())))
            .value(|item: &Item| CellValue::text(item.name));
        let item = Item {
            name: "alpha",
            size: 1.0,
        };
        assert!(matches!(column.filter_value_of(&item), CellValue::Text(s) if s == "alpha"));

        let column = column.sort_value(|item: &Item| item.size.into());
        assert!(matches!(column.sort_value_of(&item), CellValue::Number(n) if n == 1.0));
        assert!(matches!(column.filter_value_of(&item), CellValue::Text(_)));
    }

    #[test]
    fn fallback_builds_undeclared_columns() {
        let set: ColumnSet<Item> = ColumnSet::new(vec![Column::new("name")])
            .with_fallback(|key| Column::new(key).sortable(false));

        assert!(matches!(set.column("name"), Some(Cow::Borrowed(_))));
        let built = set.column("anything").unwrap();
        assert_eq!(built.id, "anything");
        assert!(!built.sortable);
        assert!(ColumnSet::<Item>::default().column("anything").is_none());
        assert_eq!(set.derived_storage_key(), "name");
    }
}
