//! # Remote API Errors
//!
//! Classifies control-plane failures by error code so callers can tell
//! "the resource is gone" apart from every other fault.

use crate::provider::types::ResourceKind;
use thiserror::Error;

/// Failure reported by a [`GlobalAcceleratorApi`](crate::provider::GlobalAcceleratorApi) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The addressed resource does not exist
    #[error("{resource} not found: {identifier}")]
    NotFound {
        resource: ResourceKind,
        identifier: String,
    },

    /// The control plane rejected the request parameters
    #[error("invalid request: {message}")]
    InvalidInput {
        code: Option<String>,
        message: String,
    },

    /// Rate limit exceeded
    #[error("request throttled: {message}")]
    Throttled { message: String },

    /// Any other service or transport failure
    #[error("Global Accelerator error{}: {message}", code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Service {
        code: Option<String>,
        message: String,
    },
}

impl ApiError {
    pub fn not_found(resource: ResourceKind, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            identifier: identifier.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: None,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if retrying the same call later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled { .. } => true,
            Self::Service { code, .. } => code
                .as_deref()
                .is_none_or(|c| TRANSIENT_CODES.contains(&c)),
            Self::NotFound { .. } | Self::InvalidInput { .. } => false,
        }
    }
}

/// Error codes meaning the addressed resource does not exist
const NOT_FOUND_CODES: &[&str] = &[
    "AcceleratorNotFoundException",
    "ListenerNotFoundException",
    "EndpointGroupNotFoundException",
    "EndpointNotFoundException",
    "AttachmentNotFoundException",
];

/// Error codes for rejected request parameters
const INVALID_INPUT_CODES: &[&str] = &[
    "InvalidArgumentException",
    "InvalidPortRangeException",
    "InvalidNextTokenException",
    "AcceleratorNotDisabledException",
    "AssociatedListenerFoundException",
    "AssociatedEndpointGroupFoundException",
];

/// Error codes for throttling
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
];

/// Error codes for faults worth retrying
const TRANSIENT_CODES: &[&str] = &["InternalServiceErrorException", "ServiceUnavailable"];

/// Classify a control-plane failure by its error code
///
/// `resource` and `identifier` name what the failing call addressed, so a
/// not-found code becomes a precise [`ApiError::NotFound`].
pub fn classify_error(
    code: Option<&str>,
    message: Option<&str>,
    resource: ResourceKind,
    identifier: &str,
) -> ApiError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ApiError::not_found(resource, identifier),
        Some(c) if INVALID_INPUT_CODES.contains(&c) => ApiError::InvalidInput {
            code: Some(c.to_string()),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => ApiError::Throttled { message },
        _ => ApiError::Service {
            code: code.map(ToString::to_string),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes_map_to_not_found() {
        for code in NOT_FOUND_CODES {
            let err = classify_error(
                Some(*code),
                Some("gone"),
                ResourceKind::Listener,
                "arn:x",
            );
            assert!(err.is_not_found(), "{code} should be not found");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_invalid_argument_is_invalid_input() {
        let err = classify_error(
            Some("InvalidArgumentException"),
            Some("bad port"),
            ResourceKind::Listener,
            "arn:x",
        );
        assert_eq!(
            err,
            ApiError::InvalidInput {
                code: Some("InvalidArgumentException".to_string()),
                message: "bad port".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_code_is_service_error() {
        let err = classify_error(Some("Weird"), None, ResourceKind::Accelerator, "arn:x");
        assert_eq!(err.to_string(), "Global Accelerator error (Weird): Unknown error");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_throttling_is_retryable() {
        let err = classify_error(
            Some("ThrottlingException"),
            Some("slow down"),
            ResourceKind::Accelerator,
            "arn:x",
        );
        assert!(err.is_retryable());
    }
}
