//! # Reconciler
//!
//! Resumable reconciliation of remote resources whose control plane
//! converges asynchronously.
//!
//! The reconciler:
//! - Issues the create, update or delete call on the first invocation
//! - Polls the resource (or its owning accelerator) on later invocations
//! - Bounds polling with a retry budget carried in the continuation token
//! - Reports recoverable failures as structured progress events
//!
//! ## Reconciliation Flow
//!
//! 1. Caller invokes with the desired model and no token
//! 2. Driver checks preconditions and issues the mutation
//! 3. Driver returns `InProgress` with a fresh token
//! 4. Caller re-invokes with the returned model and token after the delay
//! 5. Driver polls until the target converges, vanishes, or the budget runs out

pub mod driver;
pub mod handler;
pub mod probe;
pub mod types;

// Re-export public API
pub use driver::Driver;
pub use handler::{Mutation, ResourceHandler};
pub use probe::{Observed, ObservedStatus, Prober, StabilizationTarget};
pub use types::{
    FailureKind, HandlerRequest, ListPage, OperationKind, ProgressEvent, ReconcileError,
};
