//! # Reconciliation Driver
//!
//! Turns a series of stateless, possibly retried invocations into
//! "start the operation, then poll until it is terminal".
//!
//! Each call to [`Driver::reconcile`] performs one step and returns. All
//! progress lives in the [`ContinuationToken`] the caller hands back on the
//! next invocation; the driver never sleeps or loops waiting for the remote
//! side.
//!
//! | Operation | Token | Step |
//! |-----------|-------|------|
//! | Create | none | create with idempotency token, `InProgress` (full budget, delay 0) |
//! | Create | any | poll |
//! | Update | none or not pending | require existence, mutate, `InProgress` (pending, full budget, delay 0) |
//! | Update | pending | poll |
//! | Delete | none or not pending | probe; absent is `Success`, else delete and `InProgress` |
//! | Delete | pending | poll; self or owner absent is `Success` |
//!
//! Outside Delete, a poll that finds its target absent keeps polling: only
//! `Converged` ends a create or update.
//!
//! A poll spends one retry first. When the budget is gone the driver raises
//! [`ReconcileError::Timeout`] without probing.

use crate::controller::budget::{ContinuationToken, RetryBudget};
use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::handler::{Mutation, ResourceHandler};
use crate::controller::reconciler::probe::{Observed, ObservedStatus};
use crate::controller::reconciler::types::{
    FailureKind, HandlerRequest, ListPage, OperationKind, ProgressEvent, ReconcileError,
};
use crate::observability::metrics;
use std::time::Instant;
use tracing::{debug, error, field, info, info_span, warn, Instrument};

type StepResult<M> = Result<ProgressEvent<M>, ReconcileError>;

/// Resumable lifecycle driver for one resource kind
#[derive(Debug, Clone)]
pub struct Driver<H> {
    handler: H,
    budget: RetryBudget,
}

impl<H: ResourceHandler> Driver<H> {
    #[must_use]
    pub fn new(handler: H, budget: RetryBudget) -> Self {
        Self { handler, budget }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Perform one step of `operation`
    ///
    /// Pass `None` as `token` on the first invocation and the token from the
    /// previous `InProgress` event afterwards, together with the model that
    /// event carried.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Timeout`] when the retry budget is exhausted
    /// - [`ReconcileError::Remote`] when a remote call fails for any reason
    ///   other than the resource being absent
    pub async fn reconcile(
        &self,
        operation: OperationKind,
        request: &HandlerRequest<H::Model>,
        token: Option<ContinuationToken>,
    ) -> StepResult<H::Model> {
        let kind = self.handler.kind();
        let span = info_span!(
            "reconcile",
            resource.kind = kind.as_str(),
            operation = operation.as_str(),
            resource.id = field::Empty,
            retries.remaining = field::Empty,
        );
        if let Some(id) = self.handler.identifier(&request.desired_resource_state) {
            span.record("resource.id", id);
        }
        if let Some(token) = token {
            span.record("retries.remaining", token.retries_remaining);
        }

        let start = Instant::now();
        let result = async {
            match operation {
                OperationKind::Create => self.create(request, token).await,
                OperationKind::Update => self.update(request, token).await,
                OperationKind::Delete => self.delete(request, token).await,
            }
        }
        .instrument(span)
        .await;

        let outcome = match &result {
            Ok(event) => event.outcome(),
            Err(ReconcileError::Timeout { .. }) => "timeout",
            Err(ReconcileError::Remote(_)) => {
                metrics::increment_remote_errors(kind);
                "error"
            }
        };
        metrics::record_invocation(kind, operation, outcome, start.elapsed().as_secs_f64());

        result
    }

    /// Fetch the current model, including tags where the resource has them
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Remote`] for any fault other than absence.
    pub async fn read(&self, request: &HandlerRequest<H::Model>) -> StepResult<H::Model> {
        let kind = self.handler.kind();
        let Some(id) = self.handler.identifier(&request.desired_resource_state) else {
            return Ok(ProgressEvent::failed(
                FailureKind::NotFound,
                kind.not_found_message(),
            ));
        };

        match self.handler.probe(id).await? {
            Observed::Present(model) => Ok(ProgressEvent::success(model)),
            Observed::Absent => Ok(ProgressEvent::failed(
                FailureKind::NotFound,
                kind.not_found_message(),
            )),
        }
    }

    /// Fetch one page of models
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Remote`] when the listing call fails.
    pub async fn list(
        &self,
        request: &HandlerRequest<H::Model>,
        next_token: Option<&str>,
    ) -> Result<ListPage<H::Model>, ReconcileError> {
        let page = self.handler.list(request, next_token).await?;
        debug!(
            resource.kind = self.handler.kind().as_str(),
            count = page.resource_models.len(),
            more = page.next_token.is_some(),
            "Listed resources"
        );
        Ok(page)
    }

    async fn create(
        &self,
        request: &HandlerRequest<H::Model>,
        token: Option<ContinuationToken>,
    ) -> StepResult<H::Model> {
        if let Some(token) = token {
            return self
                .poll(OperationKind::Create, &request.desired_resource_state, token)
                .await;
        }

        let idempotency = IdempotencyToken::for_request(request);
        debug!(idempotency_token = %idempotency, "Issuing create");
        let mutation = self.handler.create(request, &idempotency).await?;
        Ok(self.after_mutation(OperationKind::Create, mutation))
    }

    async fn update(
        &self,
        request: &HandlerRequest<H::Model>,
        token: Option<ContinuationToken>,
    ) -> StepResult<H::Model> {
        if let Some(token) = token.filter(|t| t.pending_mutation) {
            return self
                .poll(OperationKind::Update, &request.desired_resource_state, token)
                .await;
        }

        let kind = self.handler.kind();
        let Some(id) = self.handler.identifier(&request.desired_resource_state) else {
            return Ok(ProgressEvent::failed(
                FailureKind::NotFound,
                kind.not_found_message(),
            ));
        };

        let observed = match self.handler.probe(id).await? {
            Observed::Present(observed) => observed,
            Observed::Absent => {
                warn!("Cannot update {}: it does not exist", kind);
                return Ok(ProgressEvent::failed(
                    FailureKind::NotFound,
                    kind.not_found_message(),
                ));
            }
        };

        let mutation = self.handler.update(request, &observed).await?;
        Ok(self.after_mutation(OperationKind::Update, mutation))
    }

    async fn delete(
        &self,
        request: &HandlerRequest<H::Model>,
        token: Option<ContinuationToken>,
    ) -> StepResult<H::Model> {
        let desired = &request.desired_resource_state;
        if let Some(token) = token.filter(|t| t.pending_mutation) {
            return self.poll(OperationKind::Delete, desired, token).await;
        }

        let kind = self.handler.kind();
        let observed = match self.handler.identifier(desired) {
            Some(id) => self.handler.probe(id).await?,
            None => Observed::Absent,
        };

        match observed {
            Observed::Absent => {
                info!("{} already absent, nothing to delete", kind);
                Ok(ProgressEvent::success(desired.clone()))
            }
            Observed::Present(observed) => {
                self.handler.delete(&observed).await?;
                Ok(self.after_mutation(OperationKind::Delete, Mutation::Issued(desired.clone())))
            }
        }
    }

    fn after_mutation(
        &self,
        operation: OperationKind,
        mutation: Mutation<H::Model>,
    ) -> ProgressEvent<H::Model> {
        let kind = self.handler.kind();
        match mutation {
            Mutation::Issued(model) => {
                metrics::increment_mutations(kind, operation);
                info!("🔄 {} {} issued, waiting for it to stabilize", kind, operation);
                ProgressEvent::in_progress(model, self.budget.fresh(true), 0)
            }
            Mutation::Rejected { kind: failure, message } => {
                warn!("{} {} rejected: {}", kind, operation, message);
                ProgressEvent::failed(failure, message)
            }
        }
    }

    async fn poll(
        &self,
        operation: OperationKind,
        model: &H::Model,
        token: ContinuationToken,
    ) -> StepResult<H::Model> {
        let kind = self.handler.kind();
        let next = self.budget.consume(token).map_err(|_| {
            error!("❌ {} {} exhausted its retry budget", kind, operation);
            metrics::increment_timeouts(kind);
            ReconcileError::timeout(kind)
        })?;

        let target = match self.handler.stabilization_target(model) {
            Ok(target) => target,
            Err(message) => return Ok(ProgressEvent::failed(FailureKind::InvalidRequest, message)),
        };

        metrics::increment_polls(kind);
        let status = self.handler.observe(operation, &target).await?;
        debug!(
            target = target.identifier(),
            ?status,
            retries_remaining = next.retries_remaining,
            "Polled stabilization target"
        );

        Ok(match (operation, status) {
            (_, ObservedStatus::Converged) => {
                info!("✅ {} {} complete", kind, operation);
                ProgressEvent::success(model.clone())
            }
            (OperationKind::Delete, ObservedStatus::Absent) => {
                if target.is_owner() {
                    warn!(
                        owner = target.identifier(),
                        "Owning accelerator disappeared during delete, treating {} as deleted", kind
                    );
                } else {
                    info!("✅ {} deleted", kind);
                }
                ProgressEvent::success(model.clone())
            }
            (_, ObservedStatus::Absent) => {
                // racing an out-of-band deletion; the budget still bounds this
                warn!(
                    target = target.identifier(),
                    owner = target.is_owner(),
                    retries_remaining = next.retries_remaining,
                    "Stabilization target of {} {} is absent, continuing to poll", kind, operation
                );
                ProgressEvent::in_progress(model.clone(), next, self.budget.poll_delay_secs())
            }
            (_, ObservedStatus::Converging) => {
                let delay = self.budget.poll_delay_secs();
                let next_poll = i64::try_from(delay)
                    .ok()
                    .and_then(chrono::TimeDelta::try_seconds)
                    .and_then(|d| chrono::Utc::now().checked_add_signed(d));
                debug!(
                    next_poll = ?next_poll.map(|t| t.to_rfc3339()),
                    "{} {} still converging", kind, operation
                );
                ProgressEvent::in_progress(model.clone(), next, delay)
            }
        })
    }
}
