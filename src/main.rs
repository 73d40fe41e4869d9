//! # gactl
//!
//! Command-line dispatcher for the Global Accelerator reconciler.
//!
//! Configuration comes from the environment (see [`ReconcilerConfig::from_env`])
//! with CLI flags taking precedence. Progress events go to stdout as JSON;
//! logs go to stderr.
//!
//! Exit codes: `0` for `SUCCESS` and `IN_PROGRESS`, `2` for `FAILED`, `1` for
//! faults (timeout, remote errors, bad input).

use anyhow::Result;
use clap::Parser;
use globalaccelerator_reconciler::observability::{init_tracing, metrics};
use globalaccelerator_reconciler::{
    AwsGlobalAccelerator, GlobalAcceleratorApi, InMemoryGlobalAccelerator, ReconcilerConfig,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ReconcilerConfig::from_env();
    if let Some(region) = cli.region.clone() {
        config.region = region;
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.max_stabilization_secs {
        config.max_stabilization_secs = secs;
    }

    init_tracing(&config)?;

    let print_metrics = cli.metrics && config.enable_metrics;
    if print_metrics {
        metrics::register_metrics()?;
    }

    let api: Arc<dyn GlobalAcceleratorApi> = if cli.simulate {
        info!("🧪 Using the in-memory control plane");
        Arc::new(InMemoryGlobalAccelerator::new())
    } else {
        Arc::new(AwsGlobalAccelerator::new(&config.region).await)
    };

    let budget = config.retry_budget();
    info!(
        region = %config.region,
        max_retries = budget.max_retries(),
        poll_delay_secs = budget.poll_delay_secs(),
        "gactl starting"
    );

    let result = cli::dispatch::run(cli.command, api, budget).await;

    if print_metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }

    result
}
