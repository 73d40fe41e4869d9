//! # Endpoint Group
//!
//! Endpoint groups hang off a listener. Like listeners they redeploy the
//! owning accelerator, which polls watch; the owner is found by walking the
//! endpoint group (or listener) ARN up to its accelerator prefix.

use crate::arn::{owning_accelerator, parent_of};
use crate::constants::DEFAULT_TRAFFIC_DIAL_PERCENTAGE;
use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::probe::observe;
use crate::controller::reconciler::{
    HandlerRequest, ListPage, Mutation, Observed, ObservedStatus, OperationKind, Prober,
    ResourceHandler, StabilizationTarget,
};
use crate::provider::{
    ApiError, EndpointConfiguration, EndpointGroup, EndpointGroupSettings, GlobalAcceleratorApi,
    PortOverride, ResourceKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Endpoint group resource model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointGroupModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_group_arn: Option<String>,
    pub listener_arn: String,
    pub endpoint_group_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_configurations: Option<Vec<EndpointConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_dial_percentage: Option<f32>,
    /// Negative means "use the listener port"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_interval_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_overrides: Option<Vec<PortOverride>>,
}

impl EndpointGroupModel {
    #[must_use]
    pub fn from_observed(group: &EndpointGroup) -> Self {
        Self {
            endpoint_group_arn: Some(group.arn.clone()),
            listener_arn: parent_of(&group.arn).unwrap_or_default(),
            endpoint_group_region: group.region.clone().unwrap_or_default(),
            endpoint_configurations: Some(group.endpoints.clone()),
            traffic_dial_percentage: group.traffic_dial_percentage,
            health_check_port: group.health_check_port,
            health_check_protocol: group.health_check_protocol.clone(),
            health_check_path: group.health_check_path.clone(),
            health_check_interval_seconds: group.health_check_interval_seconds,
            threshold_count: group.threshold_count,
            port_overrides: (!group.port_overrides.is_empty())
                .then(|| group.port_overrides.clone()),
        }
    }

    fn settings(&self, port_overrides: Option<Vec<PortOverride>>) -> EndpointGroupSettings {
        EndpointGroupSettings {
            endpoints: self.endpoint_configurations.clone().unwrap_or_default(),
            traffic_dial_percentage: self.traffic_dial_percentage,
            health_check_port: self.health_check_port.filter(|port| *port >= 0),
            health_check_protocol: self.health_check_protocol.clone(),
            health_check_path: self.health_check_path.clone(),
            health_check_interval_seconds: self.health_check_interval_seconds,
            threshold_count: self.threshold_count,
            port_overrides,
        }
    }

    fn owner(&self) -> Option<String> {
        self.endpoint_group_arn
            .as_deref()
            .or((!self.listener_arn.is_empty()).then_some(self.listener_arn.as_str()))
            .and_then(|arn| owning_accelerator(arn).ok())
            .map(|accelerator| accelerator.to_string())
    }
}

/// Port overrides to send on update
///
/// Desired overrides win; overrides that only the previous state had are
/// cleared; when neither side has any the field is left out.
#[must_use]
pub fn port_overrides_for_update(
    desired: Option<&[PortOverride]>,
    previous: Option<&[PortOverride]>,
) -> Option<Vec<PortOverride>> {
    match (desired, previous) {
        (Some(desired), _) => Some(desired.to_vec()),
        (None, Some(_)) => Some(Vec::new()),
        (None, None) => None,
    }
}

/// Handler for endpoint groups
#[derive(Clone)]
pub struct EndpointGroupHandler {
    api: Arc<dyn GlobalAcceleratorApi>,
    prober: Prober,
}

impl fmt::Debug for EndpointGroupHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointGroupHandler")
            .finish_non_exhaustive()
    }
}

impl EndpointGroupHandler {
    pub fn new(api: Arc<dyn GlobalAcceleratorApi>) -> Self {
        let prober = Prober::new(Arc::clone(&api));
        Self { api, prober }
    }
}

#[async_trait]
impl ResourceHandler for EndpointGroupHandler {
    type Model = EndpointGroupModel;

    fn kind(&self) -> ResourceKind {
        ResourceKind::EndpointGroup
    }

    fn identifier<'a>(&self, model: &'a EndpointGroupModel) -> Option<&'a str> {
        model.endpoint_group_arn.as_deref()
    }

    async fn probe(&self, identifier: &str) -> Result<Observed<EndpointGroupModel>, ApiError> {
        Ok(self
            .prober
            .endpoint_group(identifier)
            .await?
            .map(|group| EndpointGroupModel::from_observed(&group)))
    }

    async fn create(
        &self,
        request: &HandlerRequest<EndpointGroupModel>,
        token: &IdempotencyToken,
    ) -> Result<Mutation<EndpointGroupModel>, ApiError> {
        let desired = &request.desired_resource_state;
        let Ok(accelerator_arn) = parent_of(&desired.listener_arn) else {
            return Ok(Mutation::invalid_request(format!(
                "'{}' is not a valid listener ARN",
                desired.listener_arn
            )));
        };

        if self.prober.listener(&desired.listener_arn).await?.is_absent() {
            return Ok(Mutation::not_found(ResourceKind::Listener.not_found_message()));
        }
        if self.prober.accelerator(&accelerator_arn).await?.is_absent() {
            return Ok(Mutation::not_found(
                ResourceKind::Accelerator.not_found_message(),
            ));
        }

        info!(
            listener = %desired.listener_arn,
            region = %desired.endpoint_group_region,
            "Creating endpoint group"
        );
        let group = self
            .api
            .create_endpoint_group(
                &desired.listener_arn,
                &desired.endpoint_group_region,
                &desired.settings(desired.port_overrides.clone()),
                token.as_str(),
            )
            .await?;

        let mut model = desired.clone();
        model.endpoint_group_arn = Some(group.arn);
        Ok(Mutation::Issued(model))
    }

    async fn update(
        &self,
        request: &HandlerRequest<EndpointGroupModel>,
        observed: &EndpointGroupModel,
    ) -> Result<Mutation<EndpointGroupModel>, ApiError> {
        let Some(arn) = observed.endpoint_group_arn.as_deref() else {
            return Ok(Mutation::not_found(
                ResourceKind::EndpointGroup.not_found_message(),
            ));
        };

        let desired = &request.desired_resource_state;
        let previous_overrides = request
            .previous_resource_state
            .as_ref()
            .and_then(|previous| previous.port_overrides.as_deref());
        let overrides =
            port_overrides_for_update(desired.port_overrides.as_deref(), previous_overrides);

        let mut settings = desired.settings(overrides);
        settings.traffic_dial_percentage = Some(
            desired
                .traffic_dial_percentage
                .unwrap_or(DEFAULT_TRAFFIC_DIAL_PERCENTAGE),
        );

        info!(endpoint_group = arn, "Updating endpoint group");
        debug!(?settings, "Endpoint group settings");
        self.api.update_endpoint_group(arn, &settings).await?;

        let mut model = desired.clone();
        model.endpoint_group_arn = Some(arn.to_string());
        Ok(Mutation::Issued(model))
    }

    async fn delete(&self, observed: &EndpointGroupModel) -> Result<(), ApiError> {
        if let Some(arn) = observed.endpoint_group_arn.as_deref() {
            info!(endpoint_group = arn, "Deleting endpoint group");
            observe(self.api.delete_endpoint_group(arn)).await?;
        }
        Ok(())
    }

    fn stabilization_target(
        &self,
        model: &EndpointGroupModel,
    ) -> Result<StabilizationTarget, String> {
        model
            .owner()
            .map(StabilizationTarget::Owner)
            .ok_or_else(|| {
                "Endpoint group ARN or listener ARN is required to track progress".to_string()
            })
    }

    async fn observe(
        &self,
        _operation: OperationKind,
        target: &StabilizationTarget,
    ) -> Result<ObservedStatus, ApiError> {
        self.prober.accelerator_status(target.identifier()).await
    }

    async fn list(
        &self,
        request: &HandlerRequest<EndpointGroupModel>,
        next_token: Option<&str>,
    ) -> Result<ListPage<EndpointGroupModel>, ApiError> {
        let page = self
            .api
            .list_endpoint_groups(&request.desired_resource_state.listener_arn, next_token)
            .await?;
        Ok(ListPage {
            resource_models: page
                .items
                .iter()
                .map(EndpointGroupModel::from_observed)
                .collect(),
            next_token: page.next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDE: PortOverride = PortOverride {
        listener_port: 80,
        endpoint_port: 8080,
    };

    #[test]
    fn test_desired_overrides_win() {
        assert_eq!(
            port_overrides_for_update(Some(&[OVERRIDE][..]), None),
            Some(vec![OVERRIDE])
        );
    }

    #[test]
    fn test_removed_overrides_are_cleared() {
        assert_eq!(
            port_overrides_for_update(None, Some(&[OVERRIDE][..])),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_untouched_when_neither_side_has_overrides() {
        assert_eq!(port_overrides_for_update(None, None), None);
    }

    #[test]
    fn test_negative_health_check_port_is_dropped() {
        let model = EndpointGroupModel {
            health_check_port: Some(-1),
            ..EndpointGroupModel::default()
        };
        assert_eq!(model.settings(None).health_check_port, None);

        let model = EndpointGroupModel {
            health_check_port: Some(443),
            ..EndpointGroupModel::default()
        };
        assert_eq!(model.settings(None).health_check_port, Some(443));
    }
}
