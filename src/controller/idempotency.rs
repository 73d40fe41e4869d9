//! # Idempotency Tokens
//!
//! Every create call carries a token that stays the same for one logical
//! create, so a retried first invocation never produces a second resource.
//!
//! Sources, in order of preference:
//! 1. the caller's client request token
//! 2. the caller's logical resource identifier
//! 3. a name-based UUID of the desired model

use crate::constants::IDEMPOTENCY_NAMESPACE;
use crate::controller::reconciler::HandlerRequest;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// Derive the token for `request`
    pub fn for_request<M: Serialize>(request: &HandlerRequest<M>) -> Self {
        if let Some(token) = non_empty(request.client_request_token.as_deref()) {
            return Self(token.to_string());
        }
        if let Some(id) = non_empty(request.logical_resource_identifier.as_deref()) {
            return Self(id.to_string());
        }
        // Field order is fixed by the model's derive, so equal models serialize equally.
        let canonical = serde_json::to_vec(&request.desired_resource_state).unwrap_or_default();
        Self(Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, &canonical).to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_request_token_wins() {
        let request = HandlerRequest::new(json!({"name": "a"}))
            .with_client_request_token("crt-1")
            .with_logical_resource_identifier("MyAccelerator");
        assert_eq!(IdempotencyToken::for_request(&request).as_str(), "crt-1");
    }

    #[test]
    fn test_logical_identifier_is_fallback() {
        let request = HandlerRequest::new(json!({"name": "a"}))
            .with_client_request_token("  ")
            .with_logical_resource_identifier("MyEndpointGroup");
        assert_eq!(
            IdempotencyToken::for_request(&request).as_str(),
            "MyEndpointGroup"
        );
    }

    #[test]
    fn test_model_derived_token_is_stable() {
        let first = IdempotencyToken::for_request(&HandlerRequest::new(json!({"name": "a"})));
        let again = IdempotencyToken::for_request(&HandlerRequest::new(json!({"name": "a"})));
        let other = IdempotencyToken::for_request(&HandlerRequest::new(json!({"name": "b"})));
        assert_eq!(first, again);
        assert_ne!(first, other);
    }
}
