use serde::{Deserialize, Serialize};

/// Id of the synthetic header row. Selecting it selects every visible row.
pub const HEADER_ID: &str = "header";

/// Id of the synthetic group that lists selected rows hidden by the filter.
pub const KEPT_GROUP_ID: &str = "__kept_selected_rows";

/// Where a pinned row sits inside its sibling group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinPosition {
    First,
    Last,
}

/// Pin placement for a row that ignores sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowPin {
    /// Start or end of the sibling group.
    pub at: PinPosition,
    /// Whether the filter may hide the row.
    pub filterable: bool,
}

impl RowPin {
    /// Pins to the start of the sibling group; never hidden by the filter.
    pub const fn first() -> Self {
        Self {
            at: PinPosition::First,
            filterable: false,
        }
    }

    /// Pins to the end of the sibling group; never hidden by the filter.
    pub const fn last() -> Self {
        Self {
            at: PinPosition::Last,
            filterable: false,
        }
    }

    /// Allows the filter to hide this row like any other.
    pub const fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }
}

impl From<PinPosition> for RowPin {
    fn from(at: PinPosition) -> Self {
        Self {
            at,
            filterable: false,
        }
    }
}

/// Caller-owned row definition.
///
/// Rows form a tree through [`Row::children`]. The table never mutates a row; a new
/// snapshot has to be supplied to change data.
#[derive(Clone, Debug)]
pub struct Row<D> {
    pub id: String,
    pub kind: String,
    pub data: D,
    pub children: Vec<Self>,
    pub pin: Option<RowPin>,
    pub selectable: bool,
    pub infer_selected_state: bool,
    pub init_collapsed: bool,
    pub init_selected: bool,
}

impl<D> Row<D> {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: D) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
            children: Vec::new(),
            pin: None,
            selectable: true,
            infer_selected_state: true,
            init_collapsed: false,
            init_selected: false,
        }
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn pin(mut self, pin: impl Into<RowPin>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    #[must_use]
    pub const fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// When `false`, the row's checkbox is its own source of truth instead of
    /// being derived from its children.
    #[must_use]
    pub const fn infer_selected_state(mut self, infer: bool) -> Self {
        self.infer_selected_state = infer;
        self
    }

    #[must_use]
    pub const fn init_collapsed(mut self, collapsed: bool) -> Self {
        self.init_collapsed = collapsed;
        self
    }

    #[must_use]
    pub const fn init_selected(mut self, selected: bool) -> Self {
        self.init_selected = selected;
        self
    }
}
