use futures::future::try_join_all;
use tracing::info;

use rdd_logger_domain::model::TableSpec;
use rdd_logger_domain::storage::SchemaStore;

use crate::worker::CollectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyExists,
    Created,
}

/// Creates `spec` unless the catalog already lists it.
pub async fn ensure_table<S>(store: &S, spec: &TableSpec) -> Result<ProvisionOutcome, CollectorError>
where
    S: SchemaStore + ?Sized,
{
    info!(table = spec.name, "checking for table");
    if store.table_exists(spec.name).await? {
        info!(table = spec.name, "table already exists");
        return Ok(ProvisionOutcome::AlreadyExists);
    }

    info!(table = spec.name, "creating table");
    store.create_table(spec).await?;
    Ok(ProvisionOutcome::Created)
}

/// Provisions every table concurrently. The batch fails as soon as one table
/// fails.
pub async fn provision_tables<S>(
    store: &S,
    specs: &[TableSpec],
) -> Result<Vec<ProvisionOutcome>, CollectorError>
where
    S: SchemaStore + ?Sized,
{
    try_join_all(specs.iter().map(|spec| ensure_table(store, spec))).await
}
