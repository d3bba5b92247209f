use std::time::Duration;

use rdd_logger_domain::storage::{StorageError, StorageResult};
use sea_orm::{ConnectOptions, Database};

use crate::SeaOrmStorage;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for [`SeaOrmStorage`]. The pool is pinned to a single
/// connection so every statement shares one session.
#[derive(Debug, Clone, Default)]
pub struct StorageBuilder {
    database_url: Option<String>,
    connect_timeout: Option<Duration>,
    sql_logging: bool,
}

impl StorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn sql_logging(mut self, enabled: bool) -> Self {
        self.sql_logging = enabled;
        self
    }

    pub async fn build(self) -> StorageResult<SeaOrmStorage> {
        let url = self
            .database_url
            .ok_or_else(|| StorageError::Unreachable("missing database url".into()))?;

        let mut options = ConnectOptions::new(url);
        options
            .min_connections(1)
            .max_connections(1)
            .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
            .sqlx_logging(self.sql_logging);

        let db = Database::connect(options)
            .await
            .map_err(|err| StorageError::Unreachable(err.to_string()))?;
        db.ping()
            .await
            .map_err(|err| StorageError::Unreachable(err.to_string()))?;
        Ok(SeaOrmStorage::from_connection(db))
    }
}
