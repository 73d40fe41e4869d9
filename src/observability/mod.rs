//! # Observability
//!
//! Structured logging and Prometheus metrics.
//!
//! - `metrics`: Prometheus metrics collection
//! - [`init_tracing`]: installs the global `tracing` subscriber

pub mod metrics;

use crate::config::ReconcilerConfig;
use crate::constants::DEFAULT_LOG_FILTER;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `config.log_level` applies to this
/// crate. Logs go to stderr so stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &ReconcilerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.to_lowercase();
        EnvFilter::try_new(format!("globalaccelerator_reconciler={level},gactl={level}"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}
