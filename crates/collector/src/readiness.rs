use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rdd_logger_domain::storage::StorageError;
use rdd_logger_storage::{SeaOrmStorage, StorageBuilder};

use crate::rpc::RpcSource;
use crate::worker::CollectorError;

/// Opens the store connection during a startup attempt.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: Send + Sync;

    async fn connect(&self) -> Result<Self::Store, StorageError>;
}

#[async_trait]
impl StoreConnector for StorageBuilder {
    type Store = SeaOrmStorage;

    async fn connect(&self) -> Result<SeaOrmStorage, StorageError> {
        self.clone().build().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Probing,
    RetryWait,
    Ready,
}

/// Probes the node and opens the store concurrently; the first failure wins.
pub async fn check_requirements<R, C>(rpc: &R, connector: &C) -> Result<C::Store, CollectorError>
where
    R: RpcSource + ?Sized,
    C: StoreConnector + ?Sized,
{
    let ((), store) = tokio::try_join!(rpc.probe(), async {
        connector.connect().await.map_err(CollectorError::from)
    })?;
    Ok(store)
}

/// Repeats a startup attempt until it succeeds. Between attempts exactly one
/// retry wait is pending; it is dropped when shutdown is requested.
pub struct ReadinessGate {
    retry_delay: Duration,
    state: watch::Sender<GateState>,
    shutdown: CancellationToken,
}

impl ReadinessGate {
    pub fn new(retry_delay: Duration, shutdown: CancellationToken) -> Self {
        let (state, _) = watch::channel(GateState::Probing);
        Self {
            retry_delay,
            state,
            shutdown,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, CollectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollectorError>>,
    {
        let mut attempts: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(CollectorError::Shutdown);
            }
            attempts += 1;
            self.state.send_replace(GateState::Probing);

            let err = match attempt().await {
                Ok(value) => {
                    self.state.send_replace(GateState::Ready);
                    info!(attempts, "startup checks passed");
                    return Ok(value);
                }
                Err(err) => err,
            };

            error!(%err, attempt = attempts, "logger launch failed");
            self.state.send_replace(GateState::RetryWait);
            info!(
                delay_secs = self.retry_delay.as_secs_f64(),
                "retrying startup"
            );

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(CollectorError::Shutdown),
                _ = sleep(self.retry_delay) => {}
            }
        }
    }
}
