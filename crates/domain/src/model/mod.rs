//! Data structures shared between the collector and the storage adapters.

mod row;
mod snapshot;
mod table;

pub use row::{ColumnFilter, Row};
pub use snapshot::{ScalarKind, ScalarValue, Snapshot, SnapshotError};
pub use table::{ColumnDefault, ColumnSpec, ColumnType, TableSpec};
