use thiserror::Error;

/// Errors raised while building or sorting a table.
///
/// All of these are programmer errors in the row or column definitions; runtime
/// conditions (unknown ids, unreadable persisted state) are handled as no-ops instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The same row id appears more than once anywhere in the tree.
    #[error("duplicate row id `{id}`")]
    DuplicateRowId { id: String },

    /// A row uses an id reserved for a synthetic row.
    #[error("row id `{id}` is reserved")]
    ReservedRowId { id: String },

    /// A cell has no comparable value while its column is sorted on the client.
    #[error(
        "column `{column}` cannot be sorted on the client: row `{row}` has no comparable value \
         (provide a sort value or disable client sort for the column)"
    )]
    UnsortableValue { column: String, row: String },
}
