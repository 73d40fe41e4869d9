//! Common test utilities for reconciler integration tests
//!
//! Shared fixtures: an in-memory control plane, drivers with a small retry
//! budget, and a helper that keeps re-invoking a driver the way an
//! orchestration framework would.

#![allow(dead_code, reason = "Not every test binary uses every fixture")]

use globalaccelerator_reconciler::provider::PortRange;
use globalaccelerator_reconciler::{
    AcceleratorHandler, AcceleratorModel, AttachmentHandler, ContinuationToken, Driver,
    EndpointGroupHandler, GlobalAcceleratorApi, HandlerRequest, InMemoryGlobalAccelerator,
    ListenerHandler, ListenerModel, OperationKind, ProgressEvent, ReconcileError,
    ResourceHandler, RetryBudget,
};
use std::sync::Arc;
use std::time::Duration;

/// Retries allowed by [`budget`]
pub const TEST_MAX_RETRIES: i64 = 10;

pub fn budget() -> RetryBudget {
    RetryBudget::new(
        Duration::from_secs(1),
        Duration::from_secs(TEST_MAX_RETRIES.unsigned_abs()),
    )
}

/// Control plane whose accelerators report `IN_PROGRESS` once after each change
pub fn control_plane() -> Arc<InMemoryGlobalAccelerator> {
    Arc::new(InMemoryGlobalAccelerator::new().with_settle_after(1))
}

/// The same control plane behind the trait object handlers take
pub fn as_api(api: &Arc<InMemoryGlobalAccelerator>) -> Arc<dyn GlobalAcceleratorApi> {
    let api: Arc<dyn GlobalAcceleratorApi> = Arc::<InMemoryGlobalAccelerator>::clone(api);
    api
}

pub fn accelerator_driver(api: &Arc<InMemoryGlobalAccelerator>) -> Driver<AcceleratorHandler> {
    Driver::new(AcceleratorHandler::new(as_api(api)), budget())
}

pub fn listener_driver(api: &Arc<InMemoryGlobalAccelerator>) -> Driver<ListenerHandler> {
    Driver::new(ListenerHandler::new(as_api(api)), budget())
}

pub fn endpoint_group_driver(
    api: &Arc<InMemoryGlobalAccelerator>,
) -> Driver<EndpointGroupHandler> {
    Driver::new(EndpointGroupHandler::new(as_api(api)), budget())
}

pub fn attachment_driver(api: &Arc<InMemoryGlobalAccelerator>) -> Driver<AttachmentHandler> {
    Driver::new(AttachmentHandler::new(as_api(api)), budget())
}

pub fn accelerator_model(name: &str) -> AcceleratorModel {
    AcceleratorModel {
        name: name.to_string(),
        ..AcceleratorModel::default()
    }
}

pub fn tcp_listener(accelerator_arn: &str, port: i32) -> ListenerModel {
    ListenerModel {
        accelerator_arn: accelerator_arn.to_string(),
        port_ranges: vec![PortRange {
            from_port: port,
            to_port: port,
        }],
        protocol: "TCP".to_string(),
        ..ListenerModel::default()
    }
}

/// Every event one operation produced, ending with the terminal one
#[derive(Debug)]
pub struct Run<M> {
    pub events: Vec<ProgressEvent<M>>,
}

impl<M: Clone> Run<M> {
    pub fn last(&self) -> &ProgressEvent<M> {
        self.events.last().expect("a run always has at least one event")
    }

    pub fn final_model(&self) -> M {
        self.last()
            .resource_model()
            .cloned()
            .expect("the run should end with a model")
    }
}

/// Re-invoke `driver` with each returned model and token until terminal
pub async fn run_to_completion<H: ResourceHandler>(
    driver: &Driver<H>,
    operation: OperationKind,
    request: HandlerRequest<H::Model>,
) -> Result<Run<H::Model>, ReconcileError> {
    let mut request = request;
    let mut token: Option<ContinuationToken> = None;
    let mut events = Vec::new();

    loop {
        let event = driver.reconcile(operation, &request, token).await?;
        match &event {
            ProgressEvent::InProgress {
                resource_model,
                continuation_token,
                ..
            } => {
                request = request.with_desired(resource_model.clone());
                token = Some(*continuation_token);
                events.push(event);
            }
            _ => {
                events.push(event);
                return Ok(Run { events });
            }
        }
    }
}

/// Create an accelerator and wait until it is deployed
pub async fn deployed_accelerator(
    api: &Arc<InMemoryGlobalAccelerator>,
    name: &str,
) -> AcceleratorModel {
    let run = run_to_completion(
        &accelerator_driver(api),
        OperationKind::Create,
        HandlerRequest::new(accelerator_model(name)),
    )
    .await
    .expect("create should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));
    run.final_model()
}

/// Create a listener on `accelerator_arn` and wait until it is deployed
pub async fn deployed_listener(
    api: &Arc<InMemoryGlobalAccelerator>,
    accelerator_arn: &str,
    port: i32,
) -> ListenerModel {
    let run = run_to_completion(
        &listener_driver(api),
        OperationKind::Create,
        HandlerRequest::new(tcp_listener(accelerator_arn, port)),
    )
    .await
    .expect("create should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));
    run.final_model()
}
