//! Logger binary that snapshots the node on a schedule until interrupted.

use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rdd_logger_collector::{
    run_logger, shutdown::wait_for_signal, CollectorError, CryptoCompareClient, GateState,
    HttpRpcClient, PriceTask, ReadinessGate,
};
use rdd_logger_domain::config::LoggerConfig;
use rdd_logger_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use rdd_logger_storage::SeaOrmStorage;

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[logger] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), CollectorError> {
    let config = LoggerConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("LOGGER");
    let _telemetry = init_telemetry(&telemetry_config)?;

    let rpc = HttpRpcClient::from_config(config.rpc())?;
    let connector = SeaOrmStorage::builder().database_url(config.database_url());
    let prices = match config.price() {
        Some(price) => Some(PriceTask {
            source: CryptoCompareClient::from_config(price)?,
            currencies: price.currencies().to_vec(),
        }),
        None => None,
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let gate = ReadinessGate::new(config.startup_retry(), shutdown);
    let mut gate_state = gate.subscribe();
    tokio::spawn(async move {
        while gate_state.changed().await.is_ok() {
            let state = *gate_state.borrow_and_update();
            debug!(?state, "readiness gate");
            if state == GateState::Ready {
                break;
            }
        }
    });

    info!(rpc = %rpc.url(), "starting logger");
    match run_logger(&config, &gate, rpc, connector, prices).await {
        Ok(store) => {
            store.close().await?;
            info!("database connection closed");
            Ok(())
        }
        Err(CollectorError::Shutdown) => {
            info!("stopped before startup completed");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
