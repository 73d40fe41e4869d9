//! # Metrics
//!
//! Prometheus metrics for monitoring reconciliation.
//!
//! ## Metrics Exposed
//!
//! - `ga_reconcile_invocations_total` - Reconcile invocations by resource, operation and outcome
//! - `ga_reconcile_duration_seconds` - Duration of one reconcile invocation
//! - `ga_reconcile_mutations_total` - Mutating remote calls issued by the driver
//! - `ga_stabilization_polls_total` - Stabilization polls performed
//! - `ga_stabilization_timeouts_total` - Operations that exhausted their retry budget
//! - `ga_remote_errors_total` - Remote faults propagated to the caller

use crate::controller::reconciler::OperationKind;
use crate::provider::ResourceKind;
use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static INVOCATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ga_reconcile_invocations_total",
            "Total number of reconcile invocations",
        ),
        &["resource", "operation", "outcome"],
    )
    .expect("Failed to create INVOCATIONS_TOTAL metric - this should never happen")
});

static INVOCATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "ga_reconcile_duration_seconds",
            "Duration of one reconcile invocation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["resource", "operation"],
    )
    .expect("Failed to create INVOCATION_DURATION metric - this should never happen")
});

static MUTATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ga_reconcile_mutations_total",
            "Total number of mutating steps issued",
        ),
        &["resource", "operation"],
    )
    .expect("Failed to create MUTATIONS_TOTAL metric - this should never happen")
});

static POLLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ga_stabilization_polls_total",
            "Total number of stabilization polls",
        ),
        &["resource"],
    )
    .expect("Failed to create POLLS_TOTAL metric - this should never happen")
});

static TIMEOUTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ga_stabilization_timeouts_total",
            "Total number of operations that exhausted their retry budget",
        ),
        &["resource"],
    )
    .expect("Failed to create TIMEOUTS_TOTAL metric - this should never happen")
});

static REMOTE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ga_remote_errors_total",
            "Total number of remote faults propagated to the caller",
        ),
        &["resource"],
    )
    .expect("Failed to create REMOTE_ERRORS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(INVOCATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVOCATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(MUTATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POLLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TIMEOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_ERRORS_TOTAL.clone()))?;

    Ok(())
}

/// Render every registered metric in Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn record_invocation(
    resource: ResourceKind,
    operation: OperationKind,
    outcome: &str,
    duration: f64,
) {
    INVOCATIONS_TOTAL
        .with_label_values(&[resource.as_str(), operation.as_str(), outcome])
        .inc();
    INVOCATION_DURATION
        .with_label_values(&[resource.as_str(), operation.as_str()])
        .observe(duration);
}

pub fn increment_mutations(resource: ResourceKind, operation: OperationKind) {
    MUTATIONS_TOTAL
        .with_label_values(&[resource.as_str(), operation.as_str()])
        .inc();
}

pub fn increment_polls(resource: ResourceKind) {
    POLLS_TOTAL.with_label_values(&[resource.as_str()]).inc();
}

pub fn increment_timeouts(resource: ResourceKind) {
    TIMEOUTS_TOTAL.with_label_values(&[resource.as_str()]).inc();
}

pub fn increment_remote_errors(resource: ResourceKind) {
    REMOTE_ERRORS_TOTAL
        .with_label_values(&[resource.as_str()])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_per_label_set() {
        let before = MUTATIONS_TOTAL
            .with_label_values(&["listener", "delete"])
            .get();
        increment_mutations(ResourceKind::Listener, OperationKind::Delete);
        increment_mutations(ResourceKind::Listener, OperationKind::Delete);
        let after = MUTATIONS_TOTAL
            .with_label_values(&["listener", "delete"])
            .get();
        assert_eq!(after - before, 2);
    }
}
