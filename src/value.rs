use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Value extracted from a cell for sorting and filtering.
#[derive(Clone, Default)]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    /// Rendered content with an optional text label. Unlabeled content cannot be
    /// compared or matched.
    Content(Option<String>),
    /// Accessor for values backed by mutable state, invoked on every read.
    Lazy(Rc<dyn Fn() -> Self>),
}

impl CellValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn lazy(accessor: impl Fn() -> Self + 'static) -> Self {
        Self::Lazy(Rc::new(accessor))
    }

    /// Unwraps accessors until a plain value is reached.
    #[must_use]
    pub fn resolve(&self) -> Self {
        let mut value = self.clone();
        while let Self::Lazy(accessor) = value {
            value = accessor();
        }
        value
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Comparable key, or `None` for unlabeled content.
    pub(crate) fn sort_key(&self) -> Option<SortKey> {
        match self.resolve() {
            Self::Null => Some(SortKey::Null),
            Self::Number(n) if n.is_nan() => Some(SortKey::Null),
            Self::Number(n) => Some(SortKey::Number(n)),
            Self::Text(s) | Self::Content(Some(s)) => Some(SortKey::Text(s.to_lowercase())),
            Self::Content(None) => None,
            Self::Lazy(_) => unreachable!("resolve() never returns an accessor"),
        }
    }

    /// Tests one filter term against this value: case-insensitive substring for text,
    /// exact equality for numbers.
    pub(crate) fn matches_term(&self, term: &FilterTerm) -> bool {
        match self.resolve() {
            Self::Text(s) | Self::Content(Some(s)) => s.to_lowercase().contains(&term.lowercase),
            Self::Number(n) => term.number.is_some_and(|t| t == n),
            Self::Null | Self::Content(None) | Self::Lazy(_) => false,
        }
    }
}

impl fmt::Debug for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Content(label) => f.debug_tuple("Content").field(label).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Resolved value used by the comparator.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SortKey {
    Null,
    Number(f64),
    Text(String),
}

impl SortKey {
    /// Orders two defined keys; numbers sort before text.
    pub(crate) fn cmp_defined(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
        }
    }
}

/// One whitespace-separated term of a filter query.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FilterTerm {
    pub(crate) lowercase: String,
    pub(crate) number: Option<f64>,
}

impl FilterTerm {
    pub(crate) fn new(term: &str) -> Self {
        Self {
            lowercase: term.to_lowercase(),
            number: term.parse::<f64>().ok().filter(|n| !n.is_nan()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn lazy_values_are_read_on_every_resolve() {
        let counter = Rc::new(Cell::new(0_u32));
        let source = Rc::clone(&counter);
        let value = CellValue::lazy(move || {
            source.set(source.get() + 1);
            CellValue::from(source.get())
        });

        assert_eq!(value.sort_key(), Some(SortKey::Number(1.0)));
        assert_eq!(value.sort_key(), Some(SortKey::Number(2.0)));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn unlabeled_content_has_no_sort_key() {
        assert_eq!(CellValue::Content(None).sort_key(), None);
        assert_eq!(
            CellValue::Content(Some("Edit".into())).sort_key(),
            Some(SortKey::Text("edit".into()))
        );
    }

    #[test]
    fn term_matching_is_case_insensitive_for_text_and_exact_for_numbers() {
        let term = FilterTerm::new("ALP");
        assert!(CellValue::text("alpha").matches_term(&term));
        assert!(!CellValue::text("beta").matches_term(&term));

        let number = FilterTerm::new("42");
        assert!(CellValue::from(42_u32).matches_term(&number));
        assert!(!CellValue::from(420_u32).matches_term(&number));
        assert!(CellValue::text("x420").matches_term(&number));
        assert!(!CellValue::Null.matches_term(&number));
    }
}
