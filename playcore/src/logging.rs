//! Structured logging (§6 ambient stack): every engine-scoped log line carries `engine_id` and
//! `symbol` fields so a multi-instance process's logs can be filtered per instance; denial
//! paths additionally carry `reason` (§7's machine-readable reason codes).

use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Human-readable logging for local/interactive use — plain `tracing_subscriber::fmt`, filtered
/// by `RUST_LOG` (defaulting to `info`).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy())
        .with(fmt::layer())
        .init();
}

/// Structured JSON logging for production/live deployments, where logs are shipped to an
/// aggregator rather than read on a terminal.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy())
        .with(fmt::layer().json().flatten_event(true))
        .init();
}
