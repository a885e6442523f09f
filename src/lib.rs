//! Headless hierarchical table state for ratatui: tri-state selection, filtering, sorting,
//! collapse and persisted column visibility.
//!
//! The crate owns row identity and every derived view; painting is left to the host, which
//! reads [`TableState::rendered_rows`] and feeds it to a ratatui `Table`.
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `TableState::handle_key*` helpers.

mod action;
mod collapse;
mod column_state;
mod columns;
mod error;
mod filter;
#[cfg(feature = "keymap")]
mod keymap;
mod memo;
pub mod prelude;
mod row;
mod scroll;
mod selection;
mod sort;
mod state;
mod storage;
mod tree;
mod value;

pub use action::{TableAction, TableEvent};
pub use collapse::CollapseStore;
pub use column_state::{ColumnTracker, EXPANDED_COLUMN_KEY_PREFIX};
pub use columns::{Column, ColumnFallback, ColumnSet, ColumnWidth, ValueFn, distribute_widths};
pub use error::TableError;
pub use filter::FilterQuery;
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, TableKeyBindings};
pub use memo::{SubscriptionId, TableChange};
pub use row::{HEADER_ID, KEPT_GROUP_ID, PinPosition, Row, RowPin};
pub use scroll::{ScrollHost, ScrollPolicy, ViewportScroll};
pub use selection::{SelectionState, SelectionStore};
pub use sort::{InitialSort, SortDirection, SortMode, SortSpec, SortState};
pub use state::{
    RenderedRow, RowState, TableOptions, TableSnapshot, TableState, kept_group_label,
};
pub use storage::{DirStorage, KeyValueStorage, MemoryStorage, load_id_list, save_id_list};
pub use tree::{RowTree, TableRow};
pub use value::CellValue;
