//! # Remote State Prober
//!
//! Fetches the current state of a remote resource and folds "not found"
//! into an ordinary [`Observed::Absent`] value.

use crate::provider::{
    Accelerator, ApiError, Attachment, DeploymentStatus, EndpointGroup, GlobalAcceleratorApi,
    Listener,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A resource either exists (with its attributes) or it does not
#[derive(Debug, Clone, PartialEq)]
pub enum Observed<T> {
    Present(T),
    Absent,
}

impl<T> Observed<T> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observed<U> {
        match self {
            Self::Present(value) => Observed::Present(f(value)),
            Self::Absent => Observed::Absent,
        }
    }
}

/// Convergence status seen by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedStatus {
    Converging,
    Converged,
    Absent,
}

impl From<DeploymentStatus> for ObservedStatus {
    fn from(status: DeploymentStatus) -> Self {
        match status {
            DeploymentStatus::Deployed => Self::Converged,
            DeploymentStatus::InProgress => Self::Converging,
        }
    }
}

/// What a poll watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilizationTarget {
    /// The resource being reconciled
    Own(String),
    /// The accelerator that owns the resource being reconciled
    Owner(String),
}

impl StabilizationTarget {
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Own(id) | Self::Owner(id) => id,
        }
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }
}

/// Await a describe-style call, turning `NotFound` into `Absent`
///
/// Every other failure is returned unchanged.
pub async fn observe<T, F>(call: F) -> Result<Observed<T>, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match call.await {
        Ok(value) => Ok(Observed::Present(value)),
        Err(e) if e.is_not_found() => {
            debug!("Probe found no resource: {}", e);
            Ok(Observed::Absent)
        }
        Err(e) => Err(e),
    }
}

/// Typed probes over a [`GlobalAcceleratorApi`]
#[derive(Clone)]
pub struct Prober {
    api: Arc<dyn GlobalAcceleratorApi>,
}

impl fmt::Debug for Prober {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prober").finish_non_exhaustive()
    }
}

impl Prober {
    pub fn new(api: Arc<dyn GlobalAcceleratorApi>) -> Self {
        Self { api }
    }

    pub async fn accelerator(&self, arn: &str) -> Result<Observed<Accelerator>, ApiError> {
        observe(self.api.describe_accelerator(arn)).await
    }

    /// Deployment status of an accelerator, `Absent` when it is gone
    pub async fn accelerator_status(&self, arn: &str) -> Result<ObservedStatus, ApiError> {
        let status = match self.accelerator(arn).await? {
            Observed::Present(accelerator) => accelerator.status.into(),
            Observed::Absent => ObservedStatus::Absent,
        };
        debug!(accelerator = arn, ?status, "Observed accelerator status");
        Ok(status)
    }

    pub async fn listener(&self, arn: &str) -> Result<Observed<Listener>, ApiError> {
        observe(self.api.describe_listener(arn)).await
    }

    pub async fn endpoint_group(&self, arn: &str) -> Result<Observed<EndpointGroup>, ApiError> {
        observe(self.api.describe_endpoint_group(arn)).await
    }

    pub async fn attachment(&self, arn: &str) -> Result<Observed<Attachment>, ApiError> {
        observe(self.api.describe_attachment(arn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResourceKind;

    #[tokio::test]
    async fn test_not_found_becomes_absent() {
        let observed: Observed<()> = observe(async {
            Err(ApiError::not_found(ResourceKind::Accelerator, "arn:x"))
        })
        .await
        .expect("not found is not an error");
        assert!(observed.is_absent());
    }

    #[tokio::test]
    async fn test_other_faults_propagate_unchanged() {
        let fault = ApiError::Service {
            code: Some("InternalServiceErrorException".to_string()),
            message: "boom".to_string(),
        };
        let expected = fault.clone();
        let result: Result<Observed<()>, _> = observe(async move { Err(fault) }).await;
        assert_eq!(result.expect_err("fault should propagate"), expected);
    }

    #[tokio::test]
    async fn test_present_value_is_kept() {
        let observed = observe(async { Ok::<_, ApiError>(7) }).await.expect("ok");
        assert_eq!(observed, Observed::Present(7));
    }

    #[test]
    fn test_deployment_status_mapping() {
        assert_eq!(
            ObservedStatus::from(DeploymentStatus::Deployed),
            ObservedStatus::Converged
        );
        assert_eq!(
            ObservedStatus::from(DeploymentStatus::InProgress),
            ObservedStatus::Converging
        );
    }
}
