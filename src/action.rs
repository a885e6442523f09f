/// Actions that a user or application can initiate on the table.
///
/// Row-scoped actions apply to the active row (see `TableState::set_active_row_id`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableAction<Custom = ()> {
    /// Flip the selection of the active row; the kept group deselects its members.
    ToggleSelect,
    /// Select every visible row, or deselect all when everything is already selected.
    SelectAll,
    /// Drop every selection, including kept rows.
    ClearSelection,
    /// Toggle collapse of the active row.
    ToggleCollapse,
    /// Collapse every level, or expand everything when already collapsed.
    CollapseAll,
    /// Advance the sort cycle of a column.
    ToggleSort(String),
    /// Advance the sort cycle of the n-th visible column.
    ToggleSortAt(usize),
    /// Activate the previous rendered row.
    ActivatePrev,
    /// Activate the next rendered row.
    ActivateNext,
    /// Activate the first rendered row.
    ActivateFirst,
    /// Activate the last rendered row.
    ActivateLast,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action or key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., no active row / nothing to do).
    Unhandled,
    /// The action is forwarded to the caller for handling.
    Action(TableAction<Custom>),
}
