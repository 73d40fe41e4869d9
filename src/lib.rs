//! Global Accelerator Reconciler Library
//!
//! Resumable create/update/delete/read/list for AWS Global Accelerator
//! accelerators, listeners, endpoint groups and cross-account attachments.
//!
//! Every mutating operation is split into stateless steps: the first step
//! issues the change, later steps poll until the control plane has converged.
//! Progress between steps lives in a [`ContinuationToken`] that the caller
//! persists and hands back.
//!
//! ```rust,no_run
//! use globalaccelerator_reconciler::{
//!     AcceleratorHandler, AcceleratorModel, Driver, HandlerRequest, InMemoryGlobalAccelerator,
//!     OperationKind, ReconcilerConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(InMemoryGlobalAccelerator::new());
//! let driver = Driver::new(AcceleratorHandler::new(api), ReconcilerConfig::default().retry_budget());
//!
//! let request = HandlerRequest::new(AcceleratorModel {
//!     name: "web".to_string(),
//!     ..AcceleratorModel::default()
//! });
//! let event = driver.reconcile(OperationKind::Create, &request, None).await?;
//! assert!(!event.is_terminal());
//! # Ok(())
//! # }
//! ```

pub mod arn;
pub mod config;
pub mod constants;
pub mod controller;
pub mod observability;
pub mod provider;
pub mod resource;

pub use config::ReconcilerConfig;
pub use controller::budget::{ContinuationToken, RetryBudget};
pub use controller::diff::{diff, Delta};
pub use controller::idempotency::IdempotencyToken;
pub use controller::reconciler::{
    Driver, FailureKind, HandlerRequest, ListPage, OperationKind, ProgressEvent, ReconcileError,
    ResourceHandler,
};
pub use provider::aws::AwsGlobalAccelerator;
pub use provider::memory::InMemoryGlobalAccelerator;
pub use provider::{ApiError, GlobalAcceleratorApi};
pub use resource::{
    AcceleratorHandler, AcceleratorModel, AttachmentHandler, CrossAccountAttachmentModel,
    EndpointGroupHandler, EndpointGroupModel, ListenerHandler, ListenerModel,
};
