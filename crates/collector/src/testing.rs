//! In-memory doubles for the RPC node and the store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rdd_logger_domain::model::{Row, ScalarValue, Snapshot, TableSpec};
use rdd_logger_domain::storage::{RowStore, SchemaStore, StorageError, StorageResult};

use crate::rpc::{RpcMethod, RpcSource};
use crate::worker::CollectorError;

pub fn snapshot(fields: &[(&str, ScalarValue)]) -> Snapshot {
    fields
        .iter()
        .map(|(name, value)| (*name, value.clone()))
        .collect()
}

#[derive(Clone, Default)]
pub struct MockRpc {
    results: Arc<Mutex<HashMap<RpcMethod, Snapshot>>>,
    reachable: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
    pub probes: Arc<AtomicUsize>,
}

impl MockRpc {
    pub fn reachable() -> Self {
        let rpc = Self::default();
        rpc.set_reachable(true);
        rpc
    }

    pub fn with(self, method: RpcMethod, snapshot: Snapshot) -> Self {
        self.results.lock().unwrap().insert(method, snapshot);
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RpcSource for MockRpc {
    async fn probe(&self) -> Result<(), CollectorError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CollectorError::RpcUnreachable("connection refused".into()))
        }
    }

    async fn call(&self, method: RpcMethod) -> Result<Snapshot, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .get(&method)
            .cloned()
            .ok_or_else(|| CollectorError::call_failed(method, "RPC Error!"))
    }
}

/// Records inserts per table; tables listed in `failing` reject writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<(String, Row)>>>,
    tables: Arc<Mutex<HashSet<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fail_next_create: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes_to(&self, table: &str) {
        self.failing.lock().unwrap().insert(table.to_string());
    }

    pub fn rows(&self) -> Vec<(String, Row)> {
        self.rows.lock().unwrap().clone()
    }

    pub fn rows_for(&self, table: &str) -> Vec<Row> {
        self.rows()
            .into_iter()
            .filter(|(name, _)| name == table)
            .map(|(_, row)| row)
            .collect()
    }

    pub fn tables(&self) -> HashSet<String> {
        self.tables.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert_row(&self, table: &str, row: &Row) -> StorageResult<()> {
        if self.failing.lock().unwrap().contains(table) {
            return Err(StorageError::write(table, "Table doesn't exist"));
        }
        self.rows
            .lock()
            .unwrap()
            .push((table.to_string(), row.clone()));
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> StorageResult<bool> {
        Ok(self.tables.lock().unwrap().contains(table))
    }

    async fn create_table(&self, spec: &TableSpec) -> StorageResult<()> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(StorageError::schema(spec.name, "CREATE command denied"));
        }
        self.tables.lock().unwrap().insert(spec.name.to_string());
        Ok(())
    }
}
