//! Conversions between the SDK's types and the crate's provider types.

use crate::provider::error::classify_error;
use crate::provider::{
    Accelerator, ApiError, Attachment, AttachmentResource, DeploymentStatus,
    EndpointConfiguration, EndpointGroup, IpSet, Listener, PortOverride, PortRange, ResourceKind,
    Tag,
};
use aws_sdk_globalaccelerator::error::ProvideErrorMetadata;
use aws_sdk_globalaccelerator::types as sdk;

/// Classify an SDK failure for the resource `identifier` addresses
pub(crate) fn sdk_error<E>(err: &E, resource: ResourceKind, identifier: &str) -> ApiError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let rendered = err.to_string();
    classify_error(
        err.code(),
        Some(err.message().unwrap_or(&rendered)),
        resource,
        identifier,
    )
}

/// A successful response that omitted the resource it describes
pub(crate) fn missing(resource: ResourceKind, identifier: &str) -> ApiError {
    ApiError::not_found(resource, identifier)
}

pub(crate) fn accelerator(acc: &sdk::Accelerator) -> Accelerator {
    Accelerator {
        arn: acc.accelerator_arn().unwrap_or_default().to_string(),
        name: acc.name().unwrap_or_default().to_string(),
        ip_address_type: acc.ip_address_type().map(|t| t.as_str().to_string()),
        enabled: acc.enabled().unwrap_or(false),
        dns_name: acc.dns_name().map(str::to_string),
        dual_stack_dns_name: acc.dual_stack_dns_name().map(str::to_string),
        ip_sets: acc
            .ip_sets()
            .iter()
            .map(|set| IpSet {
                family: set.ip_address_family().map(|f| f.as_str().to_string()),
                addresses: set.ip_addresses().to_vec(),
            })
            .collect(),
        status: match acc.status() {
            Some(sdk::AcceleratorStatus::Deployed) => DeploymentStatus::Deployed,
            _ => DeploymentStatus::InProgress,
        },
    }
}

pub(crate) fn listener(listener: &sdk::Listener) -> Listener {
    Listener {
        arn: listener.listener_arn().unwrap_or_default().to_string(),
        port_ranges: listener
            .port_ranges()
            .iter()
            .map(|range| PortRange {
                from_port: range.from_port().unwrap_or_default(),
                to_port: range.to_port().unwrap_or_default(),
            })
            .collect(),
        protocol: listener.protocol().map(|p| p.as_str().to_string()),
        client_affinity: listener.client_affinity().map(|c| c.as_str().to_string()),
    }
}

pub(crate) fn endpoint_group(group: &sdk::EndpointGroup) -> EndpointGroup {
    EndpointGroup {
        arn: group.endpoint_group_arn().unwrap_or_default().to_string(),
        region: group.endpoint_group_region().map(str::to_string),
        endpoints: group
            .endpoint_descriptions()
            .iter()
            .map(|endpoint| EndpointConfiguration {
                endpoint_id: endpoint.endpoint_id().unwrap_or_default().to_string(),
                weight: endpoint.weight(),
                client_ip_preservation_enabled: endpoint.client_ip_preservation_enabled(),
            })
            .collect(),
        traffic_dial_percentage: group.traffic_dial_percentage(),
        health_check_port: group.health_check_port(),
        health_check_protocol: group.health_check_protocol().map(|p| p.as_str().to_string()),
        health_check_path: group.health_check_path().map(str::to_string),
        health_check_interval_seconds: group.health_check_interval_seconds(),
        threshold_count: group.threshold_count(),
        port_overrides: group
            .port_overrides()
            .iter()
            .map(|o| PortOverride {
                listener_port: o.listener_port().unwrap_or_default(),
                endpoint_port: o.endpoint_port().unwrap_or_default(),
            })
            .collect(),
    }
}

pub(crate) fn attachment(attachment: &sdk::Attachment) -> Attachment {
    Attachment {
        arn: attachment.attachment_arn().unwrap_or_default().to_string(),
        name: attachment.name().map(str::to_string),
        principals: attachment.principals().to_vec(),
        resources: attachment
            .resources()
            .iter()
            .map(|r| AttachmentResource {
                endpoint_id: Some(r.endpoint_id())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                cidr: r.cidr().map(str::to_string),
                region: r.region().map(str::to_string),
            })
            .collect(),
    }
}

pub(crate) fn tag(tag: &sdk::Tag) -> Tag {
    Tag::new(tag.key(), tag.value())
}

pub(crate) fn sdk_tags(tags: &[Tag]) -> Result<Vec<sdk::Tag>, ApiError> {
    tags.iter()
        .map(|tag| {
            sdk::Tag::builder()
                .key(&tag.key)
                .value(&tag.value)
                .build()
                .map_err(|e| ApiError::invalid_input(e.to_string()))
        })
        .collect()
}

pub(crate) fn sdk_port_ranges(ranges: &[PortRange]) -> Vec<sdk::PortRange> {
    ranges
        .iter()
        .map(|range| {
            sdk::PortRange::builder()
                .from_port(range.from_port)
                .to_port(range.to_port)
                .build()
        })
        .collect()
}

pub(crate) fn sdk_endpoints(
    endpoints: &[EndpointConfiguration],
) -> Vec<sdk::EndpointConfiguration> {
    endpoints
        .iter()
        .map(|endpoint| {
            sdk::EndpointConfiguration::builder()
                .endpoint_id(&endpoint.endpoint_id)
                .set_weight(endpoint.weight)
                .set_client_ip_preservation_enabled(endpoint.client_ip_preservation_enabled)
                .build()
        })
        .collect()
}

pub(crate) fn sdk_port_overrides(overrides: &[PortOverride]) -> Vec<sdk::PortOverride> {
    overrides
        .iter()
        .map(|o| {
            sdk::PortOverride::builder()
                .listener_port(o.listener_port)
                .endpoint_port(o.endpoint_port)
                .build()
        })
        .collect()
}

pub(crate) fn sdk_resources(resources: &[AttachmentResource]) -> Vec<sdk::Resource> {
    resources
        .iter()
        .map(|r| {
            sdk::Resource::builder()
                .set_endpoint_id(r.endpoint_id.clone())
                .set_cidr(r.cidr.clone())
                .set_region(r.region.clone())
                .build()
        })
        .collect()
}
