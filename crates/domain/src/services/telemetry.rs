use std::{env, net::SocketAddr, sync::Arc};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::hydrate_env_file;

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS: OnceCell<MetricsSink> = OnceCell::new();

/// Shared observability options for binaries.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<String>,
}

impl TelemetryConfig {
    /// Loads telemetry knobs from optional environment variables prefixed with
    /// `<PREFIX>_`, e.g. `LOGGER_LOG_FILTER`. Missing entries fall back to
    /// defaults so the binary boots without extra configuration.
    pub fn from_env(prefix: &str) -> Self {
        let _ = hydrate_env_file();
        let upper = prefix.trim().to_ascii_uppercase();
        let log_key = format!("{}_LOG_FILTER", upper);
        let metrics_key = format!("{}_METRICS_ADDRESS", upper);

        let log_filter = env::var(log_key).unwrap_or_else(|_| "info".to_string());
        let metrics_address = env::var(metrics_key).ok().and_then(|value| {
            if value.trim().is_empty() {
                None
            } else {
                Some(value.trim().to_string())
            }
        });

        Self {
            log_filter,
            metrics_address,
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<&str> {
        self.metrics_address.as_deref()
    }
}

#[derive(Clone)]
enum MetricsSink {
    /// Recorder installed in-process; scraped through `render_metrics`.
    Handle(Arc<PrometheusHandle>),
    /// Exporter serving `/metrics` on its own listener.
    Listener(SocketAddr),
}

/// Guard returned after telemetry initialization.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: MetricsSink,
}

impl TelemetryGuard {
    /// Renders the Prometheus exposition text, or `None` when metrics are
    /// served by the HTTP listener instead.
    pub fn render_metrics(&self) -> Option<String> {
        match &self.metrics {
            MetricsSink::Handle(handle) => Some(handle.render()),
            MetricsSink::Listener(_) => None,
        }
    }

    pub fn metrics_listener(&self) -> Option<SocketAddr> {
        match &self.metrics {
            MetricsSink::Handle(_) => None,
            MetricsSink::Listener(addr) => Some(*addr),
        }
    }
}

/// Centralized helper to wire up tracing + metrics exporters once per process.
/// Must run inside a tokio runtime when a metrics address is configured.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config)?;
    let metrics = install_metrics(config)?;

    Ok(TelemetryGuard { metrics })
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn install_metrics(config: &TelemetryConfig) -> Result<MetricsSink, TelemetryError> {
    METRICS
        .get_or_try_init(|| match config.metrics_address() {
            Some(addr) => {
                let socket: SocketAddr =
                    addr.parse().map_err(|err: std::net::AddrParseError| {
                        TelemetryError::InvalidMetricsAddress(addr.to_string(), err.to_string())
                    })?;
                PrometheusBuilder::new()
                    .with_http_listener(socket)
                    .install()
                    .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
                Ok(MetricsSink::Listener(socket))
            }
            None => PrometheusBuilder::new()
                .install_recorder()
                .map(|handle| MetricsSink::Handle(Arc::new(handle)))
                .map_err(|err| TelemetryError::Metrics(err.to_string())),
        })
        .cloned()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}
