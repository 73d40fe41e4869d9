//! # In-Memory Control Plane
//!
//! A local simulation of Global Accelerator used by the `--simulate` CLI
//! mode and by the test suite.
//!
//! It models the behaviors the reconciler depends on:
//! - every accelerator-affecting change puts the accelerator back into
//!   `IN_PROGRESS`, and it reports `DEPLOYED` again after a configurable
//!   number of describes ([`InMemoryGlobalAccelerator::with_settle_after`])
//! - an accelerator can only be deleted once it is disabled, deployed and
//!   has no listeners; a listener only once it has no endpoint groups
//! - create calls replaying an idempotency token return the resource the
//!   first call created
//! - listings are paginated with opaque next tokens
//!
//! Faults can be injected with [`InMemoryGlobalAccelerator::fail_next`].

use crate::arn::owning_accelerator;
use crate::constants::{DEFAULT_TRAFFIC_DIAL_PERCENTAGE, SERVICE_NAME};
use crate::provider::{
    Accelerator, AcceleratorSettings, ApiError, Attachment, AttachmentResource,
    AttachmentSettings, AttachmentUpdate, DeploymentStatus, EndpointGroup, EndpointGroupSettings,
    GlobalAcceleratorApi, IpSet, Listener, ListenerSettings, Page, PortRange, ResourceKind, Tag,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Account id every simulated ARN is issued under
pub const SIMULATED_ACCOUNT_ID: &str = "123456789012";

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct AcceleratorRecord {
    accelerator: Accelerator,
    /// Describes left that still report `IN_PROGRESS`
    pending_describes: u32,
}

#[derive(Debug)]
struct State {
    accelerators: BTreeMap<String, AcceleratorRecord>,
    listeners: BTreeMap<String, Listener>,
    endpoint_groups: BTreeMap<String, EndpointGroup>,
    attachments: BTreeMap<String, Attachment>,
    tags: HashMap<String, Vec<Tag>>,
    idempotency: HashMap<(ResourceKind, String), String>,
    calls: Vec<&'static str>,
    mutations: usize,
    fail_next: Option<ApiError>,
    settle_after: u32,
    page_size: usize,
    next_address: u32,
}

impl State {
    /// Log a call, failing it if a fault was injected
    fn record(&mut self, call: &'static str, mutating: bool) -> Result<(), ApiError> {
        self.calls.push(call);
        if mutating {
            self.mutations += 1;
        }
        match self.fail_next.take() {
            Some(fault) => {
                debug!(call, %fault, "Injecting simulated fault");
                Err(fault)
            }
            None => Ok(()),
        }
    }

    /// Start a new deployment of the accelerator owning `arn`
    fn redeploy(&mut self, arn: &str) {
        let Ok(owner) = owning_accelerator(arn) else {
            return;
        };
        let settle_after = self.settle_after;
        if let Some(record) = self.accelerators.get_mut(&owner.to_string()) {
            record.pending_describes = settle_after;
            record.accelerator.status = if settle_after == 0 {
                DeploymentStatus::Deployed
            } else {
                DeploymentStatus::InProgress
            };
        }
    }

    fn replayed(&self, kind: ResourceKind, token: &str) -> Option<&String> {
        self.idempotency.get(&(kind, token.to_string()))
    }

    fn remember(&mut self, kind: ResourceKind, token: &str, arn: &str) {
        self.idempotency
            .insert((kind, token.to_string()), arn.to_string());
    }

    fn allocate_addresses(&mut self, ip_address_type: Option<&str>) -> Vec<IpSet> {
        let mut sets = Vec::new();
        let base = self.next_address;
        self.next_address += 2;
        sets.push(IpSet {
            family: Some("IPv4".to_string()),
            addresses: vec![
                format!("192.0.2.{}", base % 250 + 1),
                format!("198.51.100.{}", base % 250 + 1),
            ],
        });
        if ip_address_type.is_some_and(|t| t.eq_ignore_ascii_case("DUAL_STACK")) {
            sets.push(IpSet {
                family: Some("IPv6".to_string()),
                addresses: vec![
                    format!("2001:db8::{:x}", base + 1),
                    format!("2001:db8::{:x}", base + 2),
                ],
            });
        }
        sets
    }

    fn page<T: Clone>(&self, items: Vec<T>, next_token: Option<&str>) -> Result<Page<T>, ApiError> {
        let start = match next_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .ok()
                .filter(|start| *start <= items.len())
                .ok_or_else(|| ApiError::InvalidInput {
                    code: Some("InvalidNextTokenException".to_string()),
                    message: format!("Invalid next token: {token}"),
                })?,
        };
        let end = start.saturating_add(self.page_size).min(items.len());
        Ok(Page {
            next_token: (end < items.len()).then(|| end.to_string()),
            items: items.into_iter().skip(start).take(end - start).collect(),
        })
    }

    fn accelerator(&self, arn: &str) -> Result<&AcceleratorRecord, ApiError> {
        self.accelerators
            .get(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::Accelerator, arn))
    }

    fn listener(&self, arn: &str) -> Result<&Listener, ApiError> {
        self.listeners
            .get(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::Listener, arn))
    }

    fn tagged_kind(&self, arn: &str) -> Result<ResourceKind, ApiError> {
        if self.accelerators.contains_key(arn) {
            Ok(ResourceKind::Accelerator)
        } else if self.attachments.contains_key(arn) {
            Ok(ResourceKind::CrossAccountAttachment)
        } else if arn.contains(":attachment/") {
            Err(ApiError::not_found(ResourceKind::CrossAccountAttachment, arn))
        } else {
            Err(ApiError::not_found(ResourceKind::Accelerator, arn))
        }
    }
}

fn validate_port_ranges(ranges: &[PortRange]) -> Result<(), ApiError> {
    let valid = !ranges.is_empty()
        && ranges
            .iter()
            .all(|r| {
                (1..=65535).contains(&r.from_port) && r.from_port <= r.to_port && r.to_port <= 65535
            });
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidInput {
            code: Some("InvalidPortRangeException".to_string()),
            message: "Port ranges must be non-empty and within 1-65535".to_string(),
        })
    }
}

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        Err(ApiError::invalid_input("Name must not be empty"))
    } else {
        Ok(())
    }
}

/// Simulated Global Accelerator control plane
#[derive(Debug)]
pub struct InMemoryGlobalAccelerator {
    state: Mutex<State>,
}

impl Default for InMemoryGlobalAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGlobalAccelerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                accelerators: BTreeMap::new(),
                listeners: BTreeMap::new(),
                endpoint_groups: BTreeMap::new(),
                attachments: BTreeMap::new(),
                tags: HashMap::new(),
                idempotency: HashMap::new(),
                calls: Vec::new(),
                mutations: 0,
                fail_next: None,
                settle_after: 1,
                page_size: DEFAULT_PAGE_SIZE,
                next_address: 0,
            }),
        }
    }

    /// Number of describes after a change that still report `IN_PROGRESS`
    #[must_use]
    pub fn with_settle_after(self, describes: u32) -> Self {
        self.lock().settle_after = describes;
        self
    }

    #[must_use]
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.lock().page_size = page_size.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call, whatever it is, with `fault`
    pub fn fail_next(&self, fault: ApiError) {
        self.lock().fail_next = Some(fault);
    }

    /// Mutating calls received so far, including rejected ones
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    /// Names of every call received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    #[must_use]
    pub fn accelerator_count(&self) -> usize {
        self.lock().accelerators.len()
    }

    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.lock().attachments.len()
    }

    /// Whether any resource with this ARN exists
    #[must_use]
    pub fn contains(&self, arn: &str) -> bool {
        let state = self.lock();
        state.accelerators.contains_key(arn)
            || state.listeners.contains_key(arn)
            || state.endpoint_groups.contains_key(arn)
            || state.attachments.contains_key(arn)
    }

    /// Accelerator snapshot that does not advance its deployment
    #[must_use]
    pub fn peek_accelerator(&self, arn: &str) -> Option<Accelerator> {
        self.lock()
            .accelerators
            .get(arn)
            .map(|record| record.accelerator.clone())
    }

    #[must_use]
    pub fn peek_attachment(&self, arn: &str) -> Option<Attachment> {
        self.lock().attachments.get(arn).cloned()
    }

    #[must_use]
    pub fn peek_endpoint_group(&self, arn: &str) -> Option<EndpointGroup> {
        self.lock().endpoint_groups.get(arn).cloned()
    }

    #[must_use]
    pub fn tags_of(&self, arn: &str) -> Vec<Tag> {
        self.lock().tags.get(arn).cloned().unwrap_or_default()
    }

    /// Delete an accelerator and everything under it out of band
    pub fn remove_accelerator(&self, arn: &str) {
        let mut state = self.lock();
        let prefix = format!("{arn}/");
        state.accelerators.remove(arn);
        state.tags.remove(arn);
        state.listeners.retain(|key, _| !key.starts_with(&prefix));
        state.endpoint_groups.retain(|key, _| !key.starts_with(&prefix));
    }
}

#[async_trait]
impl GlobalAcceleratorApi for InMemoryGlobalAccelerator {
    async fn describe_accelerator(&self, arn: &str) -> Result<Accelerator, ApiError> {
        let mut state = self.lock();
        state.record("DescribeAccelerator", false)?;
        let record = state
            .accelerators
            .get_mut(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::Accelerator, arn))?;

        let snapshot = record.accelerator.clone();
        if record.pending_describes > 0 {
            record.pending_describes -= 1;
            if record.pending_describes == 0 {
                record.accelerator.status = DeploymentStatus::Deployed;
            }
        }
        Ok(snapshot)
    }

    async fn create_accelerator(
        &self,
        settings: &AcceleratorSettings,
        ip_addresses: &[String],
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Accelerator, ApiError> {
        let mut state = self.lock();
        state.record("CreateAccelerator", true)?;
        if let Some(existing) = state.replayed(ResourceKind::Accelerator, idempotency_token) {
            if let Some(record) = state.accelerators.get(existing) {
                return Ok(record.accelerator.clone());
            }
        }
        require_name(&settings.name)?;

        let id = Uuid::new_v4();
        let arn = format!(
            "arn:aws:{SERVICE_NAME}::{SIMULATED_ACCOUNT_ID}:accelerator/{}",
            id.hyphenated()
        );
        let ip_sets = if ip_addresses.is_empty() {
            state.allocate_addresses(settings.ip_address_type.as_deref())
        } else {
            vec![IpSet {
                family: Some("IPv4".to_string()),
                addresses: ip_addresses.to_vec(),
            }]
        };
        let dual_stack = settings
            .ip_address_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("DUAL_STACK"));
        let short_id = id.simple().to_string();
        let accelerator = Accelerator {
            arn: arn.clone(),
            name: settings.name.clone(),
            ip_address_type: Some(
                settings
                    .ip_address_type
                    .clone()
                    .unwrap_or_else(|| "IPV4".to_string()),
            ),
            enabled: settings.enabled.unwrap_or(true),
            dns_name: Some(format!("a{}.awsglobalaccelerator.com", &short_id[..16])),
            dual_stack_dns_name: dual_stack
                .then(|| format!("a{}.dualstack.awsglobalaccelerator.com", &short_id[..16])),
            ip_sets,
            status: DeploymentStatus::InProgress,
        };

        state.accelerators.insert(
            arn.clone(),
            AcceleratorRecord {
                accelerator: accelerator.clone(),
                pending_describes: 0,
            },
        );
        state.redeploy(&arn);
        if !tags.is_empty() {
            state.tags.insert(arn.clone(), tags.to_vec());
        }
        state.remember(ResourceKind::Accelerator, idempotency_token, &arn);
        debug!(accelerator = %arn, "Simulated accelerator created");

        Ok(state.accelerator(&arn)?.accelerator.clone())
    }

    async fn update_accelerator(
        &self,
        arn: &str,
        settings: &AcceleratorSettings,
    ) -> Result<Accelerator, ApiError> {
        let mut state = self.lock();
        state.record("UpdateAccelerator", true)?;
        state.accelerator(arn)?;
        require_name(&settings.name)?;

        if let Some(record) = state.accelerators.get_mut(arn) {
            record.accelerator.name.clone_from(&settings.name);
            if let Some(ip_address_type) = &settings.ip_address_type {
                record.accelerator.ip_address_type = Some(ip_address_type.clone());
            }
            if let Some(enabled) = settings.enabled {
                record.accelerator.enabled = enabled;
            }
        }
        state.redeploy(arn);
        Ok(state.accelerator(arn)?.accelerator.clone())
    }

    async fn delete_accelerator(&self, arn: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("DeleteAccelerator", true)?;
        let accelerator = &state.accelerator(arn)?.accelerator;

        if accelerator.enabled || accelerator.status != DeploymentStatus::Deployed {
            return Err(ApiError::InvalidInput {
                code: Some("AcceleratorNotDisabledException".to_string()),
                message: "The accelerator must be disabled and deployed before it can be deleted"
                    .to_string(),
            });
        }
        let prefix = format!("{arn}/");
        if state.listeners.keys().any(|key| key.starts_with(&prefix)) {
            return Err(ApiError::InvalidInput {
                code: Some("AssociatedListenerFoundException".to_string()),
                message: "The accelerator still has listeners".to_string(),
            });
        }

        state.accelerators.remove(arn);
        state.tags.remove(arn);
        Ok(())
    }

    async fn list_accelerators(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Accelerator>, ApiError> {
        let mut state = self.lock();
        state.record("ListAccelerators", false)?;
        let items = state
            .accelerators
            .values()
            .map(|record| record.accelerator.clone())
            .collect();
        state.page(items, next_token)
    }

    async fn describe_listener(&self, arn: &str) -> Result<Listener, ApiError> {
        let mut state = self.lock();
        state.record("DescribeListener", false)?;
        state.listener(arn).cloned()
    }

    async fn create_listener(
        &self,
        accelerator_arn: &str,
        settings: &ListenerSettings,
        idempotency_token: &str,
    ) -> Result<Listener, ApiError> {
        let mut state = self.lock();
        state.record("CreateListener", true)?;
        if let Some(existing) = state.replayed(ResourceKind::Listener, idempotency_token) {
            if let Some(listener) = state.listeners.get(existing) {
                return Ok(listener.clone());
            }
        }
        state.accelerator(accelerator_arn)?;
        validate_port_ranges(&settings.port_ranges)?;

        let arn = format!("{accelerator_arn}/listener/{}", Uuid::new_v4().simple());
        let listener = Listener {
            arn: arn.clone(),
            port_ranges: settings.port_ranges.clone(),
            protocol: Some(settings.protocol.clone()),
            client_affinity: Some(
                settings
                    .client_affinity
                    .clone()
                    .unwrap_or_else(|| "NONE".to_string()),
            ),
        };
        state.listeners.insert(arn.clone(), listener.clone());
        state.redeploy(&arn);
        state.remember(ResourceKind::Listener, idempotency_token, &arn);
        Ok(listener)
    }

    async fn update_listener(
        &self,
        arn: &str,
        settings: &ListenerSettings,
    ) -> Result<Listener, ApiError> {
        let mut state = self.lock();
        state.record("UpdateListener", true)?;
        state.listener(arn)?;
        validate_port_ranges(&settings.port_ranges)?;

        let listener = state
            .listeners
            .get_mut(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::Listener, arn))?;
        listener.port_ranges.clone_from(&settings.port_ranges);
        listener.protocol = Some(settings.protocol.clone());
        if let Some(client_affinity) = &settings.client_affinity {
            listener.client_affinity = Some(client_affinity.clone());
        }
        let updated = listener.clone();
        state.redeploy(arn);
        Ok(updated)
    }

    async fn delete_listener(&self, arn: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("DeleteListener", true)?;
        state.listener(arn)?;
        let prefix = format!("{arn}/");
        if state
            .endpoint_groups
            .keys()
            .any(|key| key.starts_with(&prefix))
        {
            return Err(ApiError::InvalidInput {
                code: Some("AssociatedEndpointGroupFoundException".to_string()),
                message: "The listener still has endpoint groups".to_string(),
            });
        }
        state.listeners.remove(arn);
        state.redeploy(arn);
        Ok(())
    }

    async fn list_listeners(
        &self,
        accelerator_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<Listener>, ApiError> {
        let mut state = self.lock();
        state.record("ListListeners", false)?;
        state.accelerator(accelerator_arn)?;
        let prefix = format!("{accelerator_arn}/listener/");
        let items = state
            .listeners
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, listener)| listener.clone())
            .collect();
        state.page(items, next_token)
    }

    async fn describe_endpoint_group(&self, arn: &str) -> Result<EndpointGroup, ApiError> {
        let mut state = self.lock();
        state.record("DescribeEndpointGroup", false)?;
        state
            .endpoint_groups
            .get(arn)
            .cloned()
            .ok_or_else(|| ApiError::not_found(ResourceKind::EndpointGroup, arn))
    }

    async fn create_endpoint_group(
        &self,
        listener_arn: &str,
        region: &str,
        settings: &EndpointGroupSettings,
        idempotency_token: &str,
    ) -> Result<EndpointGroup, ApiError> {
        let mut state = self.lock();
        state.record("CreateEndpointGroup", true)?;
        if let Some(existing) = state.replayed(ResourceKind::EndpointGroup, idempotency_token) {
            if let Some(group) = state.endpoint_groups.get(existing) {
                return Ok(group.clone());
            }
        }
        state.listener(listener_arn)?;
        if region.is_empty() {
            return Err(ApiError::invalid_input("Endpoint group region must not be empty"));
        }
        let prefix = format!("{listener_arn}/endpoint-group/");
        if state
            .endpoint_groups
            .iter()
            .any(|(key, group)| key.starts_with(&prefix) && group.region.as_deref() == Some(region))
        {
            return Err(ApiError::InvalidInput {
                code: Some("EndpointGroupAlreadyExistsException".to_string()),
                message: format!("The listener already has an endpoint group in {region}"),
            });
        }

        let arn = format!("{prefix}{}", Uuid::new_v4().simple());
        let group = EndpointGroup {
            arn: arn.clone(),
            region: Some(region.to_string()),
            endpoints: settings.endpoints.clone(),
            traffic_dial_percentage: Some(
                settings
                    .traffic_dial_percentage
                    .unwrap_or(DEFAULT_TRAFFIC_DIAL_PERCENTAGE),
            ),
            health_check_port: settings.health_check_port,
            health_check_protocol: Some(
                settings
                    .health_check_protocol
                    .clone()
                    .unwrap_or_else(|| "TCP".to_string()),
            ),
            health_check_path: settings.health_check_path.clone(),
            health_check_interval_seconds: Some(
                settings.health_check_interval_seconds.unwrap_or(30),
            ),
            threshold_count: Some(settings.threshold_count.unwrap_or(3)),
            port_overrides: settings.port_overrides.clone().unwrap_or_default(),
        };
        state.endpoint_groups.insert(arn.clone(), group.clone());
        state.redeploy(&arn);
        state.remember(ResourceKind::EndpointGroup, idempotency_token, &arn);
        Ok(group)
    }

    async fn update_endpoint_group(
        &self,
        arn: &str,
        settings: &EndpointGroupSettings,
    ) -> Result<EndpointGroup, ApiError> {
        let mut state = self.lock();
        state.record("UpdateEndpointGroup", true)?;
        let group = state
            .endpoint_groups
            .get_mut(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::EndpointGroup, arn))?;

        group.endpoints.clone_from(&settings.endpoints);
        if let Some(dial) = settings.traffic_dial_percentage {
            group.traffic_dial_percentage = Some(dial);
        }
        if settings.health_check_port.is_some() {
            group.health_check_port = settings.health_check_port;
        }
        if settings.health_check_protocol.is_some() {
            group
                .health_check_protocol
                .clone_from(&settings.health_check_protocol);
        }
        if settings.health_check_path.is_some() {
            group.health_check_path.clone_from(&settings.health_check_path);
        }
        if settings.health_check_interval_seconds.is_some() {
            group.health_check_interval_seconds = settings.health_check_interval_seconds;
        }
        if settings.threshold_count.is_some() {
            group.threshold_count = settings.threshold_count;
        }
        if let Some(overrides) = &settings.port_overrides {
            group.port_overrides.clone_from(overrides);
        }
        let updated = group.clone();
        state.redeploy(arn);
        Ok(updated)
    }

    async fn delete_endpoint_group(&self, arn: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("DeleteEndpointGroup", true)?;
        state
            .endpoint_groups
            .remove(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::EndpointGroup, arn))?;
        state.redeploy(arn);
        Ok(())
    }

    async fn list_endpoint_groups(
        &self,
        listener_arn: &str,
        next_token: Option<&str>,
    ) -> Result<Page<EndpointGroup>, ApiError> {
        let mut state = self.lock();
        state.record("ListEndpointGroups", false)?;
        state.listener(listener_arn)?;
        let prefix = format!("{listener_arn}/endpoint-group/");
        let items = state
            .endpoint_groups
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, group)| group.clone())
            .collect();
        state.page(items, next_token)
    }

    async fn describe_attachment(&self, arn: &str) -> Result<Attachment, ApiError> {
        let mut state = self.lock();
        state.record("DescribeCrossAccountAttachment", false)?;
        state
            .attachments
            .get(arn)
            .cloned()
            .ok_or_else(|| ApiError::not_found(ResourceKind::CrossAccountAttachment, arn))
    }

    async fn create_attachment(
        &self,
        settings: &AttachmentSettings,
        tags: &[Tag],
        idempotency_token: &str,
    ) -> Result<Attachment, ApiError> {
        let mut state = self.lock();
        state.record("CreateCrossAccountAttachment", true)?;
        if let Some(existing) =
            state.replayed(ResourceKind::CrossAccountAttachment, idempotency_token)
        {
            if let Some(attachment) = state.attachments.get(existing) {
                return Ok(attachment.clone());
            }
        }
        require_name(&settings.name)?;

        let arn = format!(
            "arn:aws:{SERVICE_NAME}::{SIMULATED_ACCOUNT_ID}:attachment/{}",
            Uuid::new_v4().hyphenated()
        );
        let attachment = Attachment {
            arn: arn.clone(),
            name: Some(settings.name.clone()),
            principals: settings.principals.clone(),
            resources: settings.resources.clone(),
        };
        state.attachments.insert(arn.clone(), attachment.clone());
        if !tags.is_empty() {
            state.tags.insert(arn.clone(), tags.to_vec());
        }
        state.remember(ResourceKind::CrossAccountAttachment, idempotency_token, &arn);
        Ok(attachment)
    }

    async fn update_attachment(
        &self,
        arn: &str,
        update: &AttachmentUpdate,
    ) -> Result<Attachment, ApiError> {
        let mut state = self.lock();
        state.record("UpdateCrossAccountAttachment", true)?;
        let attachment = state
            .attachments
            .get_mut(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::CrossAccountAttachment, arn))?;

        if let Some(name) = &update.name {
            attachment.name = Some(name.clone());
        }
        attachment
            .principals
            .retain(|p| !update.principals.to_remove.contains(p));
        for principal in &update.principals.to_add {
            if !attachment.principals.contains(principal) {
                attachment.principals.push(principal.clone());
            }
        }

        let removed: Vec<Option<&str>> = update
            .resources
            .to_remove
            .iter()
            .map(AttachmentResource::key)
            .collect();
        attachment
            .resources
            .retain(|r| !removed.contains(&r.key()));
        for resource in &update.resources.to_add {
            if !attachment.resources.iter().any(|r| r.key() == resource.key()) {
                attachment.resources.push(resource.clone());
            }
        }
        Ok(attachment.clone())
    }

    async fn delete_attachment(&self, arn: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("DeleteCrossAccountAttachment", true)?;
        state
            .attachments
            .remove(arn)
            .ok_or_else(|| ApiError::not_found(ResourceKind::CrossAccountAttachment, arn))?;
        state.tags.remove(arn);
        Ok(())
    }

    async fn list_attachments(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Attachment>, ApiError> {
        let mut state = self.lock();
        state.record("ListCrossAccountAttachments", false)?;
        let items = state.attachments.values().cloned().collect();
        state.page(items, next_token)
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        let mut state = self.lock();
        state.record("ListTagsForResource", false)?;
        state.tagged_kind(arn)?;
        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("TagResource", true)?;
        state.tagged_kind(arn)?;
        let current = state.tags.entry(arn.to_string()).or_default();
        for tag in tags {
            match current.iter_mut().find(|existing| existing.key == tag.key) {
                Some(existing) => existing.value.clone_from(&tag.value),
                None => current.push(tag.clone()),
            }
        }
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("UntagResource", true)?;
        state.tagged_kind(arn)?;
        if let Some(current) = state.tags.get_mut(arn) {
            current.retain(|tag| !keys.contains(&tag.key));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(name: &str) -> AcceleratorSettings {
        AcceleratorSettings {
            name: name.to_string(),
            ip_address_type: None,
            enabled: None,
        }
    }

    #[tokio::test]
    async fn test_accelerator_settles_after_configured_describes() {
        let api = InMemoryGlobalAccelerator::new().with_settle_after(2);
        let created = api
            .create_accelerator(&settings("web"), &[], &[], "token-1")
            .await
            .expect("create");
        assert_eq!(created.status, DeploymentStatus::InProgress);

        let first = api.describe_accelerator(&created.arn).await.expect("describe");
        let second = api.describe_accelerator(&created.arn).await.expect("describe");
        let third = api.describe_accelerator(&created.arn).await.expect("describe");
        assert_eq!(first.status, DeploymentStatus::InProgress);
        assert_eq!(second.status, DeploymentStatus::InProgress);
        assert_eq!(third.status, DeploymentStatus::Deployed);
    }

    #[tokio::test]
    async fn test_create_replay_returns_first_resource() {
        let api = InMemoryGlobalAccelerator::new();
        let first = api
            .create_accelerator(&settings("web"), &[], &[], "same")
            .await
            .expect("create");
        let replay = api
            .create_accelerator(&settings("web"), &[], &[], "same")
            .await
            .expect("replay");
        assert_eq!(first.arn, replay.arn);
        assert_eq!(api.accelerator_count(), 1);
    }

    #[tokio::test]
    async fn test_enabled_accelerator_cannot_be_deleted() {
        let api = InMemoryGlobalAccelerator::new().with_settle_after(0);
        let created = api
            .create_accelerator(&settings("web"), &[], &[], "t")
            .await
            .expect("create");
        let err = api
            .delete_accelerator(&created.arn)
            .await
            .expect_err("enabled accelerator must not be deletable");
        assert!(matches!(err, ApiError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_listener_change_redeploys_owner() {
        let api = InMemoryGlobalAccelerator::new().with_settle_after(1);
        let acc = api
            .create_accelerator(&settings("web"), &[], &[], "t")
            .await
            .expect("create");
        api.describe_accelerator(&acc.arn).await.expect("settle");
        assert_eq!(
            api.peek_accelerator(&acc.arn).map(|a| a.status),
            Some(DeploymentStatus::Deployed)
        );

        let listener_settings = ListenerSettings {
            port_ranges: vec![PortRange {
                from_port: 80,
                to_port: 80,
            }],
            protocol: "TCP".to_string(),
            client_affinity: None,
        };
        api.create_listener(&acc.arn, &listener_settings, "l")
            .await
            .expect("listener");
        assert_eq!(
            api.peek_accelerator(&acc.arn).map(|a| a.status),
            Some(DeploymentStatus::InProgress)
        );
    }

    #[tokio::test]
    async fn test_pagination_walks_every_item() {
        let api = InMemoryGlobalAccelerator::new().with_page_size(2);
        for i in 0..5 {
            api.create_accelerator(&settings(&format!("acc-{i}")), &[], &[], &format!("t{i}"))
                .await
                .expect("create");
        }

        let mut seen = 0;
        let mut token: Option<String> = None;
        loop {
            let page = api
                .list_accelerators(token.as_deref())
                .await
                .expect("list");
            seen += page.items.len();
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, 5);
    }

    #[tokio::test]
    async fn test_injected_fault_fails_one_call() {
        let api = InMemoryGlobalAccelerator::new();
        api.fail_next(ApiError::Throttled {
            message: "slow down".to_string(),
        });
        assert!(api.list_accelerators(None).await.is_err());
        assert!(api.list_accelerators(None).await.is_ok());
    }
}
