//! # GACTL CLI
//!
//! A minimal outer dispatcher for the reconciliation driver.
//!
//! Each invocation runs one reconcile step and prints the resulting progress
//! event as JSON on stdout. The caller persists the `continuationToken` from an
//! `IN_PROGRESS` event and passes it back with `--token`, together with the
//! returned model, after `delaySeconds`. With `--wait` the CLI does that
//! itself until the event is terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Start creating an accelerator
//! gactl create accelerator --model accelerator.json
//!
//! # Continue polling with the token from the previous event
//! gactl create accelerator --model returned-model.json --token '{"retriesRemaining":14400,"pendingMutation":true}'
//!
//! # Drive a delete to completion
//! gactl delete listener --model listener.json --wait
//!
//! # Try everything against the in-memory control plane
//! gactl --simulate create accelerator --model accelerator.json --wait
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod dispatch;

/// Global Accelerator reconciliation CLI
#[derive(Debug, Parser)]
#[command(name = "gactl")]
#[command(
    about = "Resumable reconciliation for AWS Global Accelerator resources",
    long_about = None,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ", built ", env!("BUILD_DATETIME"), ")"),
    after_help = "\
Available resource kinds:
  accelerator     - Global Accelerator accelerator
  listener        - Listener on an accelerator
  endpoint-group  - Endpoint group on a listener
  attachment      - Cross-account attachment

Examples:
  gactl create accelerator --model accelerator.json
  gactl delete endpoint-group --model group.json --wait
  gactl list listener --model '{\"acceleratorArn\":\"arn:...\"}'
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Control-plane region (overrides GA_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Delay between polls in seconds (overrides GA_POLL_INTERVAL_SECS)
    #[arg(long, global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Maximum stabilization time in seconds (overrides GA_MAX_STABILIZATION_SECS)
    #[arg(long, global = true)]
    pub max_stabilization_secs: Option<u64>,

    /// Use the in-memory control plane instead of AWS
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a resource, or continue polling a create
    Create(StepArgs),
    /// Update a resource, or continue polling an update
    Update(StepArgs),
    /// Delete a resource, or continue polling a delete
    Delete(StepArgs),
    /// Show the current state of a resource
    Read {
        #[arg(value_enum, value_name = "KIND")]
        kind: ResourceKindArg,

        /// Model JSON, or a path to a file holding it ('-' for stdin)
        #[arg(long)]
        model: String,
    },
    /// List resources, one page at a time
    List {
        #[arg(value_enum, value_name = "KIND")]
        kind: ResourceKindArg,

        /// Model naming the parent (accelerator ARN for listeners, listener ARN for endpoint groups)
        #[arg(long)]
        model: Option<String>,

        /// Token from the previous page
        #[arg(long)]
        next_token: Option<String>,
    },
}

/// Arguments shared by the mutating commands
#[derive(Debug, Args)]
pub struct StepArgs {
    #[arg(value_enum, value_name = "KIND")]
    pub kind: ResourceKindArg,

    /// Desired model JSON, or a path to a file holding it ('-' for stdin)
    #[arg(long)]
    pub model: String,

    /// Previous model JSON or file (updates only)
    #[arg(long)]
    pub previous: Option<String>,

    /// Continuation token JSON from the previous step
    #[arg(long)]
    pub token: Option<String>,

    /// Caller-supplied request token used for create idempotency
    #[arg(long)]
    pub client_request_token: Option<String>,

    /// Caller's logical identifier for the resource
    #[arg(long)]
    pub logical_id: Option<String>,

    /// Keep re-invoking until the operation is terminal
    #[arg(long)]
    pub wait: bool,

    /// Write every intermediate event to stderr when waiting
    #[arg(long, requires = "wait")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKindArg {
    Accelerator,
    Listener,
    #[value(alias = "eg")]
    EndpointGroup,
    #[value(alias = "cross-account-attachment")]
    Attachment,
}
