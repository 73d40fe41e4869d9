//! # Provider Modules
//!
//! The remote Global Accelerator control plane, behind one trait.
//!
//! Implementations:
//! - [`aws::AwsGlobalAccelerator`] talks to the real service via the AWS SDK
//! - [`memory::InMemoryGlobalAccelerator`] simulates the control plane locally
//!
//! Every call addresses exactly one resource and fails with
//! [`ApiError::NotFound`] when that resource does not exist.

use async_trait::async_trait;

pub mod error;
pub mod types;

pub use error::ApiError;
pub use types::*;

/// Global Accelerator control plane
#[async_trait]
pub trait GlobalAcceleratorApi: Send + Sync {
    async fn describe_accelerator(&self, arn: &str) -> Result<Accelerator, ApiError>;

    async fn create_accelerator(
        &self,
        settings: &AcceleratorSettings,
        ip_addresses: &[String],
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Accelerator, ApiError>;

    async fn update_accelerator(
        &self,
        arn: &str,
        settings: &AcceleratorSettings,
    ) -> Result<Accelerator, ApiError>;

    /// Only succeeds once the accelerator is disabled and deployed
    async fn delete_accelerator(&self, arn: &str) -> Result<(), ApiError>;

    async fn list_accelerators(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Accelerator>, ApiError>;

    async fn describe_listener(&self, arn: &str) -> Result<Listener, ApiError>;

    async fn create_listener(
        &self,
        accelerator_arn: &str,
        settings: &ListenerSettings,
        idempotency_token: &str,
    ) -> Result<Listener, ApiError>;

    async fn update_listener(
        &self,
        arn: &str,
        settings: &ListenerSettings,
    ) -> Result<Listener, ApiError>;

    async fn delete_listener(&self, arn: &str) -> Result<(), ApiError>;

    async fn list_listeners(
        &self,
        accelerator_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<Listener>, ApiError>;

    async fn describe_endpoint_group(&self, arn: &str) -> Result<EndpointGroup, ApiError>;

    async fn create_endpoint_group(
        &self,
        listener_arn: &str,
        region: &str,
        settings: &EndpointGroupSettings,
        idempotency_token: &str,
    ) -> Result<EndpointGroup, ApiError>;

    async fn update_endpoint_group(
        &self,
        arn: &str,
        settings: &EndpointGroupSettings,
    ) -> Result<EndpointGroup, ApiError>;

    async fn delete_endpoint_group(&self, arn: &str) -> Result<(), ApiError>;

    async fn list_endpoint_groups(
        &self,
        listener_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<EndpointGroup>, ApiError>;

    async fn describe_attachment(&self, arn: &str) -> Result<Attachment, ApiError>;

    async fn create_attachment(
        &self,
        settings: &AttachmentSettings,
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Attachment, ApiError>;

    async fn update_attachment(
        &self,
        arn: &str,
        update: &AttachmentUpdate,
    ) -> Result<Attachment, ApiError>;

    async fn delete_attachment(&self, arn: &str) -> Result<(), ApiError>;

    async fn list_attachments(&self, next_token: Option<&str>)
        -> Result<Page<Attachment>, ApiError>;

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError>;

    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError>;

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError>;
}

pub mod aws;
pub mod memory;
