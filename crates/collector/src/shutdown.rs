use std::future::{pending, Future};
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `shutdown` on SIGINT (ctrl-c) or, on unix, SIGTERM.
pub async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(err) => {
                    error!(%err, "SIGTERM handler unavailable");
                    pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = signal_or_pending("SIGINT", tokio::signal::ctrl_c()) => {}
            _ = sigterm => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    signal_or_pending("ctrl-c", tokio::signal::ctrl_c()).await;

    info!("shutting down");
    shutdown.cancel();
}

/// Resolves when the signal arrives. A listener that fails to install is
/// logged and never resolves, so it cannot trigger a shutdown by itself.
async fn signal_or_pending<F>(name: &'static str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!(signal = name, "received signal"),
        Err(err) => {
            error!(signal = name, %err, "signal listener failed");
            pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn failed_listener_keeps_waiting() {
        let failing = async { Err::<(), _>(io::Error::other("no signal driver")) };

        let outcome = timeout(
            Duration::from_secs(3600),
            signal_or_pending("SIGINT", failing),
        )
        .await;

        assert!(outcome.is_err(), "a failed listener must not resolve");
    }

    #[tokio::test]
    async fn delivered_signal_resolves() {
        timeout(
            Duration::from_secs(1),
            signal_or_pending("SIGINT", async { Ok::<(), io::Error>(()) }),
        )
        .await
        .expect("resolves once the signal arrives");
    }
}
