//! SeaORM-backed storage adapter that satisfies the domain storage traits
//! while keeping the database backend swappable (MySQL in production, SQLite
//! for tests, PostgreSQL via feature flag).

mod builder;
mod row_store;
mod schema;

use std::sync::Arc;

use rdd_logger_domain::storage::{StorageError, StorageResult};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use tracing::{debug, warn};

pub use builder::StorageBuilder;

/// Shared storage handle injected into the provisioner and the collection
/// tasks. Clones share one underlying connection.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStorage {
    /// Opens a single connection to the provided database URL. The schema is
    /// left untouched; provisioning is a separate step.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        StorageBuilder::new().database_url(database_url).build().await
    }

    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    pub(crate) fn from_connection(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    /// Releases the connection. When other clones are still alive the
    /// connection closes once the last of them is dropped.
    pub async fn close(self) -> StorageResult<()> {
        match Arc::try_unwrap(self.db) {
            Ok(db) => {
                db.close().await.map_err(StorageError::from_source)?;
                debug!("store connection closed");
                Ok(())
            }
            Err(_) => {
                warn!("store connection still shared; deferring close to last owner");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_reports_sqlite_backend_and_closes() {
        let storage = SeaOrmStorage::connect("sqlite::memory:")
            .await
            .expect("sqlite connects");

        assert_eq!(storage.backend(), DatabaseBackend::Sqlite);
        storage.close().await.expect("closes cleanly");
    }
}
