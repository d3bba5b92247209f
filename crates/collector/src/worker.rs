use std::fmt::Display;

use thiserror::Error;
use tracing::{error, info, warn};

use rdd_logger_domain::{
    config::{ConfigError, LoggerConfig},
    model::TableSpec,
    services::telemetry::TelemetryError,
    storage::{RowStore, SchemaStore, StorageError},
};

use crate::{
    pipeline::{run_cycle, CollectionPlan},
    price::{run_price_logger, PriceSource},
    provision::provision_tables,
    readiness::{check_requirements, ReadinessGate, StoreConnector},
    rpc::{RpcMethod, RpcSource},
    scheduler::Scheduler,
    tables::logger_tables,
};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("rpc server unreachable: {0}")]
    RpcUnreachable(String),
    #[error("rpc call `{method}` failed: {message}")]
    RpcCallFailed { method: String, message: String },
    #[error("price feed error: {0}")]
    PriceFeed(String),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("shutdown requested")]
    Shutdown,
}

impl CollectorError {
    pub fn call_failed(method: RpcMethod, err: impl Display) -> Self {
        Self::RpcCallFailed {
            method: method.as_str().to_string(),
            message: err.to_string(),
        }
    }
}

/// Market data to log alongside each cycle.
pub struct PriceTask<P> {
    pub source: P,
    pub currencies: Vec<String>,
}

/// One readiness attempt: both dependencies must answer, then every table
/// must exist. The opened store is handed back only when all of that holds.
pub async fn startup_attempt<R, C>(
    rpc: &R,
    connector: &C,
    tables: &[TableSpec],
) -> Result<C::Store, CollectorError>
where
    R: RpcSource + ?Sized,
    C: StoreConnector + ?Sized,
    C::Store: SchemaStore,
{
    info!("checking requirements");
    let store = check_requirements(rpc, connector).await?;
    info!("rpc server and database reachable");

    provision_tables(&store, tables).await?;
    info!(tables = tables.len(), "schema ready");
    Ok(store)
}

/// Runs the logger until the gate's shutdown token fires: wait for the
/// dependencies, then collect on every scheduler tick. The caller owns `gate`
/// and may observe its state through [`ReadinessGate::subscribe`]. Returns
/// the store so the caller can close it.
pub async fn run_logger<R, C, P>(
    config: &LoggerConfig,
    gate: &ReadinessGate,
    rpc: R,
    connector: C,
    prices: Option<PriceTask<P>>,
) -> Result<C::Store, CollectorError>
where
    R: RpcSource,
    C: StoreConnector,
    C::Store: RowStore + SchemaStore,
    P: PriceSource,
{
    let tables = logger_tables();
    let store = gate
        .run(|| startup_attempt(&rpc, &connector, &tables))
        .await?;

    if prices.is_none() {
        warn!("price logging disabled");
    }

    let plan = CollectionPlan::new(config.rpc().info_method());
    let scheduler = Scheduler::new(
        config.refresh_interval().clone(),
        gate.shutdown_token().clone(),
    );
    scheduler
        .run(|| collect_once(&rpc, &store, &plan, prices.as_ref()))
        .await;

    Ok(store)
}

async fn collect_once<R, S, P>(
    rpc: &R,
    store: &S,
    plan: &CollectionPlan,
    prices: Option<&PriceTask<P>>,
) where
    R: RpcSource + ?Sized,
    S: RowStore + ?Sized,
    P: PriceSource,
{
    let price_run = async {
        match prices {
            Some(task) => Some(run_price_logger(&task.source, store, &task.currencies).await),
            None => None,
        }
    };
    let (cycle, price) = tokio::join!(run_cycle(rpc, store, plan), price_run);

    if let Err(err) = cycle {
        error!(%err, "logger cycle failed");
    }
    if let Some(Err(err)) = price {
        error!(%err, "price logging failed");
    }
}
