//! # Reconciler Types
//!
//! Requests, progress events, and errors exchanged with the caller.

use crate::controller::budget::ContinuationToken;
use crate::provider::{ApiError, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle operation driven by [`Driver::reconcile`](super::Driver::reconcile)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation's input, as delivered by the orchestration framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest<M> {
    /// Model the caller wants; on polls, the model returned with the last `InProgress`
    pub desired_resource_state: M,
    /// Model before this update, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_resource_state: Option<M>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_identifier: Option<String>,
}

impl<M> HandlerRequest<M> {
    pub fn new(desired_resource_state: M) -> Self {
        Self {
            desired_resource_state,
            previous_resource_state: None,
            client_request_token: None,
            logical_resource_identifier: None,
        }
    }

    #[must_use]
    pub fn with_previous(mut self, previous: M) -> Self {
        self.previous_resource_state = Some(previous);
        self
    }

    #[must_use]
    pub fn with_client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_logical_resource_identifier(mut self, id: impl Into<String>) -> Self {
        self.logical_resource_identifier = Some(id.into());
        self
    }

    /// Same metadata, different desired state
    #[must_use]
    pub fn with_desired(mut self, desired: M) -> Self {
        self.desired_resource_state = desired;
        self
    }
}

/// Recoverable failure categories reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    NotFound,
    InvalidRequest,
}

/// Result of one reconcile step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ProgressEvent<M> {
    /// Re-invoke after `delay_seconds` with this model and token
    InProgress {
        resource_model: M,
        continuation_token: ContinuationToken,
        delay_seconds: u64,
    },
    Success {
        resource_model: M,
    },
    Failed {
        error_code: FailureKind,
        message: String,
    },
}

impl<M> ProgressEvent<M> {
    pub fn success(resource_model: M) -> Self {
        Self::Success { resource_model }
    }

    pub fn failed(error_code: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            error_code,
            message: message.into(),
        }
    }

    pub fn in_progress(
        resource_model: M,
        continuation_token: ContinuationToken,
        delay_seconds: u64,
    ) -> Self {
        Self::InProgress {
            resource_model,
            continuation_token,
            delay_seconds,
        }
    }

    /// No further invocation is needed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }

    #[must_use]
    pub fn continuation_token(&self) -> Option<ContinuationToken> {
        match self {
            Self::InProgress {
                continuation_token, ..
            } => Some(*continuation_token),
            _ => None,
        }
    }

    #[must_use]
    pub fn resource_model(&self) -> Option<&M> {
        match self {
            Self::InProgress { resource_model, .. } | Self::Success { resource_model } => {
                Some(resource_model)
            }
            Self::Failed { .. } => None,
        }
    }

    /// Label for logs and metrics
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::InProgress { .. } => "in_progress",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One page of models returned by a list request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<M> {
    pub resource_models: Vec<M>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Faults raised instead of a [`ProgressEvent`]
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The retry budget ran out; re-invoking will not help
    #[error("{message}")]
    Timeout {
        resource: ResourceKind,
        message: &'static str,
    },

    /// A remote call failed; propagated unmodified
    #[error(transparent)]
    Remote(#[from] ApiError),
}

impl ReconcileError {
    pub fn timeout(resource: ResourceKind) -> Self {
        Self::Timeout {
            resource,
            message: resource.timeout_message(),
        }
    }

    /// The operation is stuck and must not be retried
    #[must_use]
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Re-invoking with the same inputs may succeed (throttling, transient service faults)
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_retryable(),
            Self::Timeout { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_never_retryable() {
        let err = ReconcileError::timeout(ResourceKind::Listener);
        assert!(err.is_unrecoverable());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_remote_retryability_follows_api_error() {
        let throttled = ReconcileError::from(ApiError::Throttled {
            message: "Rate exceeded".to_string(),
        });
        assert!(throttled.is_retryable());
        assert!(!throttled.is_unrecoverable());

        let not_found =
            ReconcileError::from(ApiError::not_found(ResourceKind::Accelerator, "arn:x"));
        assert!(!not_found.is_retryable());

        let invalid = ReconcileError::from(ApiError::invalid_input("bad port"));
        assert!(!invalid.is_retryable());
    }
}
