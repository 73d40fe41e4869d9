//! # Accelerator
//!
//! Lifecycle of the accelerator itself. Polls watch the accelerator's own
//! deployment status.
//!
//! Deletion is a two-step protocol: an enabled accelerator is disabled
//! first, and only a disabled, fully deployed accelerator can be deleted.
//! Each delete poll looks at the accelerator and issues whichever step is due.

use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::probe::observe;
use crate::controller::reconciler::{
    HandlerRequest, ListPage, Mutation, Observed, ObservedStatus, OperationKind, Prober,
    ResourceHandler, StabilizationTarget,
};
use crate::provider::{
    Accelerator, AcceleratorSettings, ApiError, DeploymentStatus, GlobalAcceleratorApi,
    ResourceKind, Tag,
};
use crate::resource::tags::{apply_tag_delta, validate_tags};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const BYOIP_UPDATE_UNSUPPORTED: &str = "Updates for BYOIP IP addresses is not a supported operation. Delete existing accelerator and create new accelerator with updated IPs.";

/// Accelerator resource model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator_arn: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address_type: Option<String>,
    /// BYOIP addresses to assign on create; reports the assigned addresses afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_stack_dns_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

impl AcceleratorModel {
    /// Model describing `accelerator` as it exists remotely
    #[must_use]
    pub fn from_observed(accelerator: &Accelerator, tags: Option<Vec<Tag>>) -> Self {
        Self {
            name: accelerator.name.clone(),
            ip_address_type: accelerator.ip_address_type.clone(),
            enabled: Some(accelerator.enabled),
            tags,
            ..Self::default()
        }
        .with_observed(accelerator)
    }

    /// Copy the read-only attributes of `accelerator` into this model
    #[must_use]
    pub fn with_observed(mut self, accelerator: &Accelerator) -> Self {
        let addresses_of = |family: &str| -> Vec<String> {
            accelerator
                .ip_sets
                .iter()
                .filter(|set| {
                    set.family
                        .as_deref()
                        .is_some_and(|f| f.eq_ignore_ascii_case(family))
                })
                .flat_map(|set| set.addresses.iter().cloned())
                .collect()
        };

        self.accelerator_arn = Some(accelerator.arn.clone());
        self.dns_name.clone_from(&accelerator.dns_name);
        self.dual_stack_dns_name
            .clone_from(&accelerator.dual_stack_dns_name);
        self.ip_addresses = Some(
            accelerator
                .ip_sets
                .iter()
                .flat_map(|set| set.addresses.iter().cloned())
                .collect(),
        );
        self.ipv4_addresses = Some(addresses_of("ipv4"));
        self.ipv6_addresses = Some(addresses_of("ipv6"));
        self
    }

    fn settings(&self) -> AcceleratorSettings {
        AcceleratorSettings {
            name: self.name.clone(),
            ip_address_type: self.ip_address_type.clone(),
            enabled: self.enabled,
        }
    }
}

/// Handler for accelerators
#[derive(Clone)]
pub struct AcceleratorHandler {
    api: Arc<dyn GlobalAcceleratorApi>,
    prober: Prober,
}

impl fmt::Debug for AcceleratorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratorHandler").finish_non_exhaustive()
    }
}

impl AcceleratorHandler {
    pub fn new(api: Arc<dyn GlobalAcceleratorApi>) -> Self {
        let prober = Prober::new(Arc::clone(&api));
        Self { api, prober }
    }

    async fn disable(
        &self,
        arn: &str,
        name: &str,
        ip_address_type: Option<String>,
    ) -> Result<(), ApiError> {
        info!(accelerator = arn, "Disabling accelerator before deletion");
        let settings = AcceleratorSettings {
            name: name.to_string(),
            ip_address_type,
            enabled: Some(false),
        };
        self.api.update_accelerator(arn, &settings).await?;
        Ok(())
    }

    /// Take the next deletion step for `arn`
    async fn advance_deletion(&self, arn: &str) -> Result<ObservedStatus, ApiError> {
        let accelerator = match self.prober.accelerator(arn).await? {
            Observed::Present(accelerator) => accelerator,
            Observed::Absent => return Ok(ObservedStatus::Absent),
        };

        if accelerator.enabled {
            self.disable(arn, &accelerator.name, accelerator.ip_address_type.clone())
                .await?;
        } else if accelerator.status == DeploymentStatus::Deployed {
            info!(accelerator = arn, "Deleting disabled accelerator");
            if observe(self.api.delete_accelerator(arn)).await?.is_absent() {
                return Ok(ObservedStatus::Absent);
            }
        } else {
            debug!(accelerator = arn, "Waiting for disabled accelerator to deploy");
        }

        Ok(ObservedStatus::Converging)
    }
}

#[async_trait]
impl ResourceHandler for AcceleratorHandler {
    type Model = AcceleratorModel;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Accelerator
    }

    fn identifier<'a>(&self, model: &'a AcceleratorModel) -> Option<&'a str> {
        model.accelerator_arn.as_deref()
    }

    async fn probe(&self, identifier: &str) -> Result<Observed<AcceleratorModel>, ApiError> {
        let accelerator = match self.prober.accelerator(identifier).await? {
            Observed::Present(accelerator) => accelerator,
            Observed::Absent => return Ok(Observed::Absent),
        };
        let tags = observe(self.api.list_tags(identifier)).await?;
        Ok(tags.map(|tags| AcceleratorModel::from_observed(&accelerator, Some(tags))))
    }

    async fn create(
        &self,
        request: &HandlerRequest<AcceleratorModel>,
        token: &IdempotencyToken,
    ) -> Result<Mutation<AcceleratorModel>, ApiError> {
        let desired = &request.desired_resource_state;
        if let Err(e) = validate_tags(desired.tags.as_deref()) {
            return Ok(Mutation::invalid_request(e.to_string()));
        }

        info!(name = %desired.name, "Creating accelerator");
        let accelerator = self
            .api
            .create_accelerator(
                &desired.settings(),
                desired.ip_addresses.as_deref().unwrap_or_default(),
                desired.tags.as_deref().unwrap_or_default(),
                token.as_str(),
            )
            .await?;

        Ok(Mutation::Issued(desired.clone().with_observed(&accelerator)))
    }

    async fn update(
        &self,
        request: &HandlerRequest<AcceleratorModel>,
        observed: &AcceleratorModel,
    ) -> Result<Mutation<AcceleratorModel>, ApiError> {
        let desired = &request.desired_resource_state;
        let byoip_changed = match (&desired.ip_addresses, &request.previous_resource_state) {
            (Some(ips), Some(previous)) => previous.ip_addresses.as_ref() != Some(ips),
            _ => false,
        };
        if byoip_changed {
            return Ok(Mutation::invalid_request(BYOIP_UPDATE_UNSUPPORTED));
        }
        if let Err(e) = validate_tags(desired.tags.as_deref()) {
            return Ok(Mutation::invalid_request(e.to_string()));
        }

        let Some(arn) = observed.accelerator_arn.as_deref() else {
            return Ok(Mutation::not_found(ResourceKind::Accelerator.not_found_message()));
        };

        info!(accelerator = arn, "Updating accelerator");
        let accelerator = self.api.update_accelerator(arn, &desired.settings()).await?;
        apply_tag_delta(
            self.api.as_ref(),
            arn,
            observed.tags.as_deref(),
            desired.tags.as_deref(),
        )
        .await?;

        Ok(Mutation::Issued(desired.clone().with_observed(&accelerator)))
    }

    async fn delete(&self, observed: &AcceleratorModel) -> Result<(), ApiError> {
        let Some(arn) = observed.accelerator_arn.as_deref() else {
            return Ok(());
        };
        if observed.enabled.unwrap_or(true) {
            self.disable(arn, &observed.name, observed.ip_address_type.clone())
                .await
        } else {
            self.advance_deletion(arn).await.map(|_| ())
        }
    }

    fn stabilization_target(
        &self,
        model: &AcceleratorModel,
    ) -> Result<StabilizationTarget, String> {
        model
            .accelerator_arn
            .clone()
            .map(StabilizationTarget::Own)
            .ok_or_else(|| "Accelerator ARN is required to track progress".to_string())
    }

    async fn observe(
        &self,
        operation: OperationKind,
        target: &StabilizationTarget,
    ) -> Result<ObservedStatus, ApiError> {
        match operation {
            OperationKind::Delete => self.advance_deletion(target.identifier()).await,
            OperationKind::Create | OperationKind::Update => {
                self.prober.accelerator_status(target.identifier()).await
            }
        }
    }

    async fn list(
        &self,
        _request: &HandlerRequest<AcceleratorModel>,
        next_token: Option<&str>,
    ) -> Result<ListPage<AcceleratorModel>, ApiError> {
        let page = self.api.list_accelerators(next_token).await?;
        Ok(ListPage {
            resource_models: page
                .items
                .iter()
                .map(|accelerator| AcceleratorModel::from_observed(accelerator, None))
                .collect(),
            next_token: page.next_token,
        })
    }
}
