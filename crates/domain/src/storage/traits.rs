use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Row, TableSpec};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("store unreachable: {0}")]
    Unreachable(String),
    #[error("schema error on `{table}`: {message}")]
    Schema { table: String, message: String },
    #[error("write to `{table}` failed: {message}")]
    Write { table: String, message: String },
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    pub fn schema(table: &str, err: impl std::fmt::Display) -> Self {
        Self::Schema {
            table: table.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(table: &str, err: impl std::fmt::Display) -> Self {
        Self::Write {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Asks the catalog whether `table` exists. Errors are propagated rather
    /// than read as "absent".
    async fn table_exists(&self, table: &str) -> StorageResult<bool>;
    async fn create_table(&self, spec: &TableSpec) -> StorageResult<()>;
}

#[async_trait]
pub trait RowStore: Send + Sync {
    async fn insert_row(&self, table: &str, row: &Row) -> StorageResult<()>;
}
