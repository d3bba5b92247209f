use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, histogram};
use tracing::{error, info};

use rdd_logger_domain::config::InfoMethod;
use rdd_logger_domain::model::{Row, Snapshot};
use rdd_logger_domain::storage::{RowStore, StorageError};

use crate::rpc::{RpcMethod, RpcSource};
use crate::tables::{getinfo_filter, staking_filter, GETINFO_TABLE, STAKING_TABLE};
use crate::worker::CollectorError;

/// Fields that carry node diagnostics rather than metrics.
const NOISY_FIELDS: &[&str] = &["errors", "warnings"];

/// Fixed per deployment: which method feeds the `getinfo` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionPlan {
    info_method: InfoMethod,
}

impl CollectionPlan {
    pub fn new(info_method: InfoMethod) -> Self {
        Self { info_method }
    }

    fn info_rpc(&self) -> RpcMethod {
        self.info_method.into()
    }

    /// Moves wallet-only fields onto the info snapshot and strips noise.
    fn reshape_info(&self, info: &mut Snapshot, wallet: &Snapshot) {
        info.copy_field(wallet, "txcount");
        if self.info_method == InfoMethod::GetBlockchainInfo {
            info.copy_field(wallet, "balance");
        }
        for field in NOISY_FIELDS {
            info.remove(field);
        }
    }
}

/// Per-table outcome of one cycle's write stage.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub written: Vec<&'static str>,
    pub failed: Vec<StorageError>,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One collection: fetch everything, then write everything. A failed fetch
/// aborts before any write; a failed write leaves its siblings alone.
pub async fn run_cycle<R, S>(
    rpc: &R,
    store: &S,
    plan: &CollectionPlan,
) -> Result<CycleReport, CollectorError>
where
    R: RpcSource + ?Sized,
    S: RowStore + ?Sized,
{
    let started = Instant::now();
    info!("# start logging");

    let fetched = tokio::try_join!(
        rpc.call(RpcMethod::GetStakingInfo),
        rpc.call(plan.info_rpc()),
        rpc.call(RpcMethod::GetWalletInfo),
    );
    let (staking, mut node, wallet) = match fetched {
        Ok(snapshots) => snapshots,
        Err(err) => {
            counter!("logger_cycles_total", "result" => "fetch_failed").increment(1);
            return Err(err);
        }
    };
    info!("load from rpc server successful");

    plan.reshape_info(&mut node, &wallet);
    let rows = [
        (STAKING_TABLE, Row::project(&staking, staking_filter())),
        (GETINFO_TABLE, Row::project(&node, getinfo_filter())),
    ];

    let outcomes = join_all(rows.iter().map(|(table, row)| async move {
        (*table, store.insert_row(table, row).await)
    }))
    .await;

    let mut report = CycleReport::default();
    for (table, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                counter!("logger_rows_written_total", "table" => table, "result" => "ok")
                    .increment(1);
                report.written.push(table);
            }
            Err(err) => {
                counter!("logger_rows_written_total", "table" => table, "result" => "error")
                    .increment(1);
                error!(table, %err, "write to db failed");
                report.failed.push(err);
            }
        }
    }

    histogram!("logger_cycle_duration_seconds").record(started.elapsed().as_secs_f64());
    if report.is_complete() {
        counter!("logger_cycles_total", "result" => "ok").increment(1);
        info!("write to db successful");
        info!("# done logging");
    } else {
        counter!("logger_cycles_total", "result" => "partial").increment(1);
    }
    Ok(report)
}
