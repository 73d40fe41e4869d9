//! # Resource Handler Seam
//!
//! Per-resource knowledge plugged into the generic [`Driver`](super::Driver):
//! how to call the remote API for each lifecycle step, and what a poll
//! watches while the resource converges.

use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::probe::{Observed, ObservedStatus, StabilizationTarget};
use crate::controller::reconciler::types::{FailureKind, HandlerRequest, ListPage, OperationKind};
use crate::provider::{ApiError, ResourceKind};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Outcome of a handler's mutating step
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<M> {
    /// Mutation(s) accepted; carries the model to return to the caller
    Issued(M),
    /// A local precondition failed; nothing was sent
    Rejected { kind: FailureKind, message: String },
}

impl<M> Mutation<M> {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Rejected {
            kind: FailureKind::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Rejected {
            kind: FailureKind::NotFound,
            message: message.into(),
        }
    }
}

/// Lifecycle hooks for one resource kind
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    type Model: Clone + Debug + Serialize + DeserializeOwned + Send + Sync;

    fn kind(&self) -> ResourceKind;

    /// Remote identifier carried by `model`, once it has one
    fn identifier<'a>(&self, model: &'a Self::Model) -> Option<&'a str>;

    /// Fetch the resource itself as a model
    async fn probe(&self, identifier: &str) -> Result<Observed<Self::Model>, ApiError>;

    /// Issue the create call; the returned model carries the new identifier
    async fn create(
        &self,
        request: &HandlerRequest<Self::Model>,
        token: &IdempotencyToken,
    ) -> Result<Mutation<Self::Model>, ApiError>;

    /// Issue the update call(s) against the currently observed resource
    async fn update(
        &self,
        request: &HandlerRequest<Self::Model>,
        observed: &Self::Model,
    ) -> Result<Mutation<Self::Model>, ApiError>;

    /// Issue the delete call, or the first step towards it
    async fn delete(&self, observed: &Self::Model) -> Result<(), ApiError>;

    /// What polls watch for `model`
    ///
    /// # Errors
    ///
    /// Returns a message when `model` lacks the identifier needed to poll.
    fn stabilization_target(&self, model: &Self::Model) -> Result<StabilizationTarget, String>;

    /// One poll of `target`
    ///
    /// During delete this may issue the next deletion step.
    async fn observe(
        &self,
        operation: OperationKind,
        target: &StabilizationTarget,
    ) -> Result<ObservedStatus, ApiError>;

    async fn list(
        &self,
        request: &HandlerRequest<Self::Model>,
        next_token: Option<&str>,
    ) -> Result<ListPage<Self::Model>, ApiError>;
}
