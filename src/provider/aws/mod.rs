//! # AWS Global Accelerator Client
//!
//! [`GlobalAcceleratorApi`] backed by the official AWS Rust SDK.
//!
//! Credentials come from the SDK's default provider chain (environment,
//! shared profile, web identity, instance metadata). Every call runs inside
//! an `aws.globalaccelerator` span carrying the operation name and the ARN
//! it addresses.

mod convert;

use crate::provider::{
    Accelerator, AcceleratorSettings, ApiError, Attachment, AttachmentSettings, AttachmentUpdate,
    EndpointGroup, EndpointGroupSettings, GlobalAcceleratorApi, Listener, ListenerSettings, Page,
    ResourceKind, Tag,
};
use async_trait::async_trait;
use aws_sdk_globalaccelerator::types::{
    ClientAffinity, HealthCheckProtocol, IpAddressType, Protocol,
};
use aws_sdk_globalaccelerator::Client;
use convert::{missing, sdk_error};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

/// AWS Global Accelerator provider implementation
pub struct AwsGlobalAccelerator {
    client: Client,
    region: String,
}

impl std::fmt::Debug for AwsGlobalAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsGlobalAccelerator")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// `None` for an empty collection so the SDK leaves the field out
fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Resource kind a tagging call addresses, judged from its ARN
fn tagged_kind(arn: &str) -> ResourceKind {
    if arn.contains(":attachment/") {
        ResourceKind::CrossAccountAttachment
    } else {
        ResourceKind::Accelerator
    }
}

impl AwsGlobalAccelerator {
    /// Create a client for `region` using the default credential chain
    pub async fn new(region: &str) -> Self {
        info!(region, "Loading AWS configuration for Global Accelerator");
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
            region: region.to_string(),
        }
    }

    async fn call<T, F>(
        &self,
        operation: &'static str,
        identifier: &str,
        request: F,
    ) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>> + Send,
    {
        let span = info_span!(
            "aws.globalaccelerator",
            operation,
            resource.id = identifier,
            region = %self.region
        );
        let start = Instant::now();
        let result = request.instrument(span).await;
        match &result {
            Ok(_) => debug!(
                operation,
                elapsed = ?start.elapsed(),
                "Global Accelerator call succeeded"
            ),
            Err(e) => debug!(
                operation,
                elapsed = ?start.elapsed(),
                error = %e,
                "Global Accelerator call failed"
            ),
        }
        result
    }
}

#[async_trait]
impl GlobalAcceleratorApi for AwsGlobalAccelerator {
    async fn describe_accelerator(&self, arn: &str) -> Result<Accelerator, ApiError> {
        const KIND: ResourceKind = ResourceKind::Accelerator;
        self.call("DescribeAccelerator", arn, async {
            let output = self
                .client
                .describe_accelerator()
                .accelerator_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .accelerator()
                .map(convert::accelerator)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn create_accelerator(
        &self,
        settings: &AcceleratorSettings,
        ip_addresses: &[String],
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Accelerator, ApiError> {
        const KIND: ResourceKind = ResourceKind::Accelerator;
        let name = settings.name.as_str();
        self.call("CreateAccelerator", name, async {
            let output = self
                .client
                .create_accelerator()
                .name(name)
                .set_ip_address_type(settings.ip_address_type.as_deref().map(IpAddressType::from))
                .set_ip_addresses(non_empty(ip_addresses.to_vec()))
                .set_enabled(settings.enabled)
                .set_tags(non_empty(convert::sdk_tags(tags)?))
                .idempotency_token(idempotency_token)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, name))?;
            output
                .accelerator()
                .map(convert::accelerator)
                .ok_or_else(|| missing(KIND, name))
        })
        .await
    }

    async fn update_accelerator(
        &self,
        arn: &str,
        settings: &AcceleratorSettings,
    ) -> Result<Accelerator, ApiError> {
        const KIND: ResourceKind = ResourceKind::Accelerator;
        self.call("UpdateAccelerator", arn, async {
            let output = self
                .client
                .update_accelerator()
                .accelerator_arn(arn)
                .name(&settings.name)
                .set_ip_address_type(settings.ip_address_type.as_deref().map(IpAddressType::from))
                .set_enabled(settings.enabled)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .accelerator()
                .map(convert::accelerator)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn delete_accelerator(&self, arn: &str) -> Result<(), ApiError> {
        self.call("DeleteAccelerator", arn, async {
            self.client
                .delete_accelerator()
                .accelerator_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Accelerator, arn))?;
            Ok(())
        })
        .await
    }

    async fn list_accelerators(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Accelerator>, ApiError> {
        self.call("ListAccelerators", "", async {
            let output = self
                .client
                .list_accelerators()
                .set_next_token(next_token.map(str::to_string))
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Accelerator, ""))?;
            Ok(Page {
                items: output.accelerators().iter().map(convert::accelerator).collect(),
                next_token: output.next_token().map(str::to_string),
            })
        })
        .await
    }

    async fn describe_listener(&self, arn: &str) -> Result<Listener, ApiError> {
        const KIND: ResourceKind = ResourceKind::Listener;
        self.call("DescribeListener", arn, async {
            let output = self
                .client
                .describe_listener()
                .listener_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .listener()
                .map(convert::listener)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn create_listener(
        &self,
        accelerator_arn: &str,
        settings: &ListenerSettings,
        idempotency_token: &str,
    ) -> Result<Listener, ApiError> {
        const KIND: ResourceKind = ResourceKind::Listener;
        self.call("CreateListener", accelerator_arn, async {
            let output = self
                .client
                .create_listener()
                .accelerator_arn(accelerator_arn)
                .set_port_ranges(Some(convert::sdk_port_ranges(&settings.port_ranges)))
                .protocol(Protocol::from(settings.protocol.as_str()))
                .set_client_affinity(settings.client_affinity.as_deref().map(ClientAffinity::from))
                .idempotency_token(idempotency_token)
                .send()
                .await
                // A missing accelerator surfaces here, so classify against it
                .map_err(|e| sdk_error(&e, ResourceKind::Accelerator, accelerator_arn))?;
            output
                .listener()
                .map(convert::listener)
                .ok_or_else(|| missing(KIND, accelerator_arn))
        })
        .await
    }

    async fn update_listener(
        &self,
        arn: &str,
        settings: &ListenerSettings,
    ) -> Result<Listener, ApiError> {
        const KIND: ResourceKind = ResourceKind::Listener;
        self.call("UpdateListener", arn, async {
            let output = self
                .client
                .update_listener()
                .listener_arn(arn)
                .set_port_ranges(Some(convert::sdk_port_ranges(&settings.port_ranges)))
                .protocol(Protocol::from(settings.protocol.as_str()))
                .set_client_affinity(settings.client_affinity.as_deref().map(ClientAffinity::from))
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .listener()
                .map(convert::listener)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn delete_listener(&self, arn: &str) -> Result<(), ApiError> {
        self.call("DeleteListener", arn, async {
            self.client
                .delete_listener()
                .listener_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Listener, arn))?;
            Ok(())
        })
        .await
    }

    async fn list_listeners(
        &self,
        accelerator_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<Listener>, ApiError> {
        self.call("ListListeners", accelerator_arn, async {
            let output = self
                .client
                .list_listeners()
                .accelerator_arn(accelerator_arn)
                .set_next_token(next_token.map(str::to_string))
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Accelerator, accelerator_arn))?;
            Ok(Page {
                items: output.listeners().iter().map(convert::listener).collect(),
                next_token: output.next_token().map(str::to_string),
            })
        })
        .await
    }

    async fn describe_endpoint_group(&self, arn: &str) -> Result<EndpointGroup, ApiError> {
        const KIND: ResourceKind = ResourceKind::EndpointGroup;
        self.call("DescribeEndpointGroup", arn, async {
            let output = self
                .client
                .describe_endpoint_group()
                .endpoint_group_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .endpoint_group()
                .map(convert::endpoint_group)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn create_endpoint_group(
        &self,
        listener_arn: &str,
        region: &str,
        settings: &EndpointGroupSettings,
        idempotency_token: &str,
    ) -> Result<EndpointGroup, ApiError> {
        const KIND: ResourceKind = ResourceKind::EndpointGroup;
        self.call("CreateEndpointGroup", listener_arn, async {
            let output = self
                .client
                .create_endpoint_group()
                .listener_arn(listener_arn)
                .endpoint_group_region(region)
                .set_endpoint_configurations(non_empty(convert::sdk_endpoints(&settings.endpoints)))
                .set_traffic_dial_percentage(settings.traffic_dial_percentage)
                .set_health_check_port(settings.health_check_port)
                .set_health_check_protocol(
                    settings
                        .health_check_protocol
                        .as_deref()
                        .map(HealthCheckProtocol::from),
                )
                .set_health_check_path(settings.health_check_path.clone())
                .set_health_check_interval_seconds(settings.health_check_interval_seconds)
                .set_threshold_count(settings.threshold_count)
                .set_port_overrides(
                    settings
                        .port_overrides
                        .as_deref()
                        .map(convert::sdk_port_overrides),
                )
                .idempotency_token(idempotency_token)
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Listener, listener_arn))?;
            output
                .endpoint_group()
                .map(convert::endpoint_group)
                .ok_or_else(|| missing(KIND, listener_arn))
        })
        .await
    }

    async fn update_endpoint_group(
        &self,
        arn: &str,
        settings: &EndpointGroupSettings,
    ) -> Result<EndpointGroup, ApiError> {
        const KIND: ResourceKind = ResourceKind::EndpointGroup;
        self.call("UpdateEndpointGroup", arn, async {
            let output = self
                .client
                .update_endpoint_group()
                .endpoint_group_arn(arn)
                .set_endpoint_configurations(Some(convert::sdk_endpoints(&settings.endpoints)))
                .set_traffic_dial_percentage(settings.traffic_dial_percentage)
                .set_health_check_port(settings.health_check_port)
                .set_health_check_protocol(
                    settings
                        .health_check_protocol
                        .as_deref()
                        .map(HealthCheckProtocol::from),
                )
                .set_health_check_path(settings.health_check_path.clone())
                .set_health_check_interval_seconds(settings.health_check_interval_seconds)
                .set_threshold_count(settings.threshold_count)
                .set_port_overrides(
                    settings
                        .port_overrides
                        .as_deref()
                        .map(convert::sdk_port_overrides),
                )
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .endpoint_group()
                .map(convert::endpoint_group)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn delete_endpoint_group(&self, arn: &str) -> Result<(), ApiError> {
        self.call("DeleteEndpointGroup", arn, async {
            self.client
                .delete_endpoint_group()
                .endpoint_group_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::EndpointGroup, arn))?;
            Ok(())
        })
        .await
    }

    async fn list_endpoint_groups(
        &self,
        listener_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<EndpointGroup>, ApiError> {
        self.call("ListEndpointGroups", listener_arn, async {
            let output = self
                .client
                .list_endpoint_groups()
                .listener_arn(listener_arn)
                .set_next_token(next_token.map(str::to_string))
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::Listener, listener_arn))?;
            Ok(Page {
                items: output
                    .endpoint_groups()
                    .iter()
                    .map(convert::endpoint_group)
                    .collect(),
                next_token: output.next_token().map(str::to_string),
            })
        })
        .await
    }

    async fn describe_attachment(&self, arn: &str) -> Result<Attachment, ApiError> {
        const KIND: ResourceKind = ResourceKind::CrossAccountAttachment;
        self.call("DescribeCrossAccountAttachment", arn, async {
            let output = self
                .client
                .describe_cross_account_attachment()
                .attachment_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .cross_account_attachment()
                .map(convert::attachment)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn create_attachment(
        &self,
        settings: &AttachmentSettings,
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Attachment, ApiError> {
        const KIND: ResourceKind = ResourceKind::CrossAccountAttachment;
        let name = settings.name.as_str();
        self.call("CreateCrossAccountAttachment", name, async {
            let output = self
                .client
                .create_cross_account_attachment()
                .name(name)
                .set_principals(non_empty(settings.principals.clone()))
                .set_resources(non_empty(convert::sdk_resources(&settings.resources)))
                .set_tags(non_empty(convert::sdk_tags(tags)?))
                .idempotency_token(idempotency_token)
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, name))?;
            output
                .cross_account_attachment()
                .map(convert::attachment)
                .ok_or_else(|| missing(KIND, name))
        })
        .await
    }

    async fn update_attachment(
        &self,
        arn: &str,
        update: &AttachmentUpdate,
    ) -> Result<Attachment, ApiError> {
        const KIND: ResourceKind = ResourceKind::CrossAccountAttachment;
        self.call("UpdateCrossAccountAttachment", arn, async {
            let output = self
                .client
                .update_cross_account_attachment()
                .attachment_arn(arn)
                .set_name(update.name.clone())
                .set_add_principals(non_empty(update.principals.to_add.clone()))
                .set_remove_principals(non_empty(update.principals.to_remove.clone()))
                .set_add_resources(non_empty(convert::sdk_resources(&update.resources.to_add)))
                .set_remove_resources(non_empty(convert::sdk_resources(
                    &update.resources.to_remove,
                )))
                .send()
                .await
                .map_err(|e| sdk_error(&e, KIND, arn))?;
            output
                .cross_account_attachment()
                .map(convert::attachment)
                .ok_or_else(|| missing(KIND, arn))
        })
        .await
    }

    async fn delete_attachment(&self, arn: &str) -> Result<(), ApiError> {
        self.call("DeleteCrossAccountAttachment", arn, async {
            self.client
                .delete_cross_account_attachment()
                .attachment_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::CrossAccountAttachment, arn))?;
            Ok(())
        })
        .await
    }

    async fn list_attachments(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Attachment>, ApiError> {
        self.call("ListCrossAccountAttachments", "", async {
            let output = self
                .client
                .list_cross_account_attachments()
                .set_next_token(next_token.map(str::to_string))
                .send()
                .await
                .map_err(|e| sdk_error(&e, ResourceKind::CrossAccountAttachment, ""))?;
            Ok(Page {
                items: output
                    .cross_account_attachments()
                    .iter()
                    .map(convert::attachment)
                    .collect(),
                next_token: output.next_token().map(str::to_string),
            })
        })
        .await
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        self.call("ListTagsForResource", arn, async {
            let output = self
                .client
                .list_tags_for_resource()
                .resource_arn(arn)
                .send()
                .await
                .map_err(|e| sdk_error(&e, tagged_kind(arn), arn))?;
            Ok(output.tags().iter().map(convert::tag).collect())
        })
        .await
    }

    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        self.call("TagResource", arn, async {
            self.client
                .tag_resource()
                .resource_arn(arn)
                .set_tags(Some(convert::sdk_tags(tags)?))
                .send()
                .await
                .map_err(|e| sdk_error(&e, tagged_kind(arn), arn))?;
            Ok(())
        })
        .await
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        self.call("UntagResource", arn, async {
            self.client
                .untag_resource()
                .resource_arn(arn)
                .set_tag_keys(Some(keys.to_vec()))
                .send()
                .await
                .map_err(|e| sdk_error(&e, tagged_kind(arn), arn))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_kind_from_arn() {
        assert_eq!(
            tagged_kind(
                "arn:aws:globalaccelerator::123456789012:attachment/1234abcd-abcd-1234-abcd-1234abcdef00"
            ),
            ResourceKind::CrossAccountAttachment
        );
        assert_eq!(
            tagged_kind(
                "arn:aws:globalaccelerator::123456789012:accelerator/1234abcd-abcd-1234-abcd-1234abcdef00"
            ),
            ResourceKind::Accelerator
        );
    }

    #[test]
    fn test_non_empty_drops_empty_collections() {
        assert_eq!(non_empty(Vec::<String>::new()), None);
        assert_eq!(non_empty(vec![1]), Some(vec![1]));
    }
}
