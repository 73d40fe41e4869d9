//! # Remote API Types
//!
//! Wire-neutral descriptions of Global Accelerator resources as the control
//! plane reports them, plus the settings the mutating calls accept.

use crate::controller::diff::Delta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four resource kinds this crate reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Accelerator,
    Listener,
    EndpointGroup,
    CrossAccountAttachment,
}

impl ResourceKind {
    /// Stable label for logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerator => "accelerator",
            Self::Listener => "listener",
            Self::EndpointGroup => "endpoint_group",
            Self::CrossAccountAttachment => "cross_account_attachment",
        }
    }

    /// Message reported when the resource does not exist
    #[must_use]
    pub fn not_found_message(self) -> &'static str {
        match self {
            Self::Accelerator => "Accelerator not found.",
            Self::Listener => "Listener not found.",
            Self::EndpointGroup => "Endpoint Group not found.",
            Self::CrossAccountAttachment => "Attachment not found.",
        }
    }

    /// Message carried by the timeout fault
    #[must_use]
    pub fn timeout_message(self) -> &'static str {
        match self {
            Self::Accelerator => "Timed out waiting for global accelerator to be deployed.",
            Self::Listener => "Timed out waiting for listener to be deployed.",
            Self::EndpointGroup => "Timed out waiting for endpoint group to be deployed.",
            Self::CrossAccountAttachment => {
                "Timed out waiting for cross-account attachment to be available."
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Inclusive listener port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRange {
    pub from_port: i32,
    pub to_port: i32,
}

/// Endpoint registered in an endpoint group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfiguration {
    pub endpoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip_preservation_enabled: Option<bool>,
}

/// Listener port to endpoint port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOverride {
    pub listener_port: i32,
    pub endpoint_port: i32,
}

/// Resource shared through a cross-account attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl AttachmentResource {
    /// Identity used when diffing: the endpoint id, else the CIDR
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.endpoint_id.as_deref().or(self.cidr.as_deref())
    }
}

/// Accelerator deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Deployed,
    InProgress,
}

/// Static IP set assigned to an accelerator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpSet {
    pub family: Option<String>,
    pub addresses: Vec<String>,
}

/// Accelerator as reported by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct Accelerator {
    pub arn: String,
    pub name: String,
    pub ip_address_type: Option<String>,
    pub enabled: bool,
    pub dns_name: Option<String>,
    pub dual_stack_dns_name: Option<String>,
    pub ip_sets: Vec<IpSet>,
    pub status: DeploymentStatus,
}

/// Listener as reported by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub arn: String,
    pub port_ranges: Vec<PortRange>,
    pub protocol: Option<String>,
    pub client_affinity: Option<String>,
}

/// Endpoint group as reported by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointGroup {
    pub arn: String,
    pub region: Option<String>,
    pub endpoints: Vec<EndpointConfiguration>,
    pub traffic_dial_percentage: Option<f32>,
    pub health_check_port: Option<i32>,
    pub health_check_protocol: Option<String>,
    pub health_check_path: Option<String>,
    pub health_check_interval_seconds: Option<i32>,
    pub threshold_count: Option<i32>,
    pub port_overrides: Vec<PortOverride>,
}

/// Cross-account attachment as reported by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub arn: String,
    pub name: Option<String>,
    pub principals: Vec<String>,
    pub resources: Vec<AttachmentResource>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Mutable accelerator settings
#[derive(Debug, Clone, PartialEq)]
pub struct AcceleratorSettings {
    pub name: String,
    pub ip_address_type: Option<String>,
    pub enabled: Option<bool>,
}

/// Mutable listener settings
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerSettings {
    pub port_ranges: Vec<PortRange>,
    pub protocol: String,
    pub client_affinity: Option<String>,
}

/// Mutable endpoint group settings
///
/// `port_overrides: None` leaves the remote overrides untouched;
/// `Some(vec![])` clears them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndpointGroupSettings {
    pub endpoints: Vec<EndpointConfiguration>,
    pub traffic_dial_percentage: Option<f32>,
    pub health_check_port: Option<i32>,
    pub health_check_protocol: Option<String>,
    pub health_check_path: Option<String>,
    pub health_check_interval_seconds: Option<i32>,
    pub threshold_count: Option<i32>,
    pub port_overrides: Option<Vec<PortOverride>>,
}

/// Settings for a new cross-account attachment
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentSettings {
    pub name: String,
    pub principals: Vec<String>,
    pub resources: Vec<AttachmentResource>,
}

/// Incremental change to an existing cross-account attachment
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentUpdate {
    pub name: Option<String>,
    pub principals: Delta<String>,
    pub resources: Delta<AttachmentResource>,
}
