pub use crate::{
    CellValue, Column, ColumnSet, ColumnWidth, InitialSort, KeyValueStorage, MemoryStorage,
    RenderedRow, Row, RowPin, RowState, ScrollHost, SelectionState, SortDirection, SortMode,
    SortSpec, TableAction, TableChange, TableError, TableEvent, TableOptions, TableSnapshot,
    TableState,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, TableKeyBindings};
