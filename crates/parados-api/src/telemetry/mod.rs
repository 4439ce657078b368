//! Logging and metrics
//!
//! - Structured logs through `tracing`, JSON by default
//! - Prometheus metrics for the predict endpoint and the model slot

pub mod metrics;

pub use metrics::PredictionMetrics;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    Encoding(String),

    #[error("Failed to install log subscriber: {0}")]
    Subscriber(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };

    installed.map_err(|e| TelemetryError::Subscriber(e.to_string()))
}
