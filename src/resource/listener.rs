//! # Listener
//!
//! Listeners have no deployment status of their own; every listener change
//! redeploys the owning accelerator, so polls watch that accelerator.

use crate::arn::parent_of;
use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::probe::observe;
use crate::controller::reconciler::{
    HandlerRequest, ListPage, Mutation, Observed, ObservedStatus, OperationKind, Prober,
    ResourceHandler, StabilizationTarget,
};
use crate::provider::{
    ApiError, GlobalAcceleratorApi, Listener, ListenerSettings, PortRange, ResourceKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Listener resource model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_arn: Option<String>,
    pub accelerator_arn: String,
    pub port_ranges: Vec<PortRange>,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_affinity: Option<String>,
}

impl ListenerModel {
    #[must_use]
    pub fn from_observed(listener: &Listener) -> Self {
        Self {
            listener_arn: Some(listener.arn.clone()),
            accelerator_arn: parent_of(&listener.arn).unwrap_or_default(),
            port_ranges: listener.port_ranges.clone(),
            protocol: listener.protocol.clone().unwrap_or_default(),
            client_affinity: listener.client_affinity.clone(),
        }
    }

    fn settings(&self) -> ListenerSettings {
        ListenerSettings {
            port_ranges: self.port_ranges.clone(),
            protocol: self.protocol.clone(),
            client_affinity: self.client_affinity.clone(),
        }
    }
}

/// Handler for listeners
#[derive(Clone)]
pub struct ListenerHandler {
    api: Arc<dyn GlobalAcceleratorApi>,
    prober: Prober,
}

impl fmt::Debug for ListenerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandler").finish_non_exhaustive()
    }
}

impl ListenerHandler {
    pub fn new(api: Arc<dyn GlobalAcceleratorApi>) -> Self {
        let prober = Prober::new(Arc::clone(&api));
        Self { api, prober }
    }
}

#[async_trait]
impl ResourceHandler for ListenerHandler {
    type Model = ListenerModel;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Listener
    }

    fn identifier<'a>(&self, model: &'a ListenerModel) -> Option<&'a str> {
        model.listener_arn.as_deref()
    }

    async fn probe(&self, identifier: &str) -> Result<Observed<ListenerModel>, ApiError> {
        Ok(self
            .prober
            .listener(identifier)
            .await?
            .map(|listener| ListenerModel::from_observed(&listener)))
    }

    async fn create(
        &self,
        request: &HandlerRequest<ListenerModel>,
        token: &IdempotencyToken,
    ) -> Result<Mutation<ListenerModel>, ApiError> {
        let desired = &request.desired_resource_state;
        if self.prober.accelerator(&desired.accelerator_arn).await?.is_absent() {
            return Ok(Mutation::not_found(
                ResourceKind::Accelerator.not_found_message(),
            ));
        }

        info!(accelerator = %desired.accelerator_arn, "Creating listener");
        let listener = self
            .api
            .create_listener(&desired.accelerator_arn, &desired.settings(), token.as_str())
            .await?;

        let mut model = desired.clone();
        model.listener_arn = Some(listener.arn);
        Ok(Mutation::Issued(model))
    }

    async fn update(
        &self,
        request: &HandlerRequest<ListenerModel>,
        observed: &ListenerModel,
    ) -> Result<Mutation<ListenerModel>, ApiError> {
        let Some(arn) = observed.listener_arn.as_deref() else {
            return Ok(Mutation::not_found(ResourceKind::Listener.not_found_message()));
        };

        info!(listener = arn, "Updating listener");
        let desired = &request.desired_resource_state;
        self.api.update_listener(arn, &desired.settings()).await?;

        let mut model = desired.clone();
        model.listener_arn = Some(arn.to_string());
        Ok(Mutation::Issued(model))
    }

    async fn delete(&self, observed: &ListenerModel) -> Result<(), ApiError> {
        if let Some(arn) = observed.listener_arn.as_deref() {
            info!(listener = arn, "Deleting listener");
            observe(self.api.delete_listener(arn)).await?;
        }
        Ok(())
    }

    fn stabilization_target(&self, model: &ListenerModel) -> Result<StabilizationTarget, String> {
        let owner = model
            .listener_arn
            .as_deref()
            .and_then(|arn| parent_of(arn).ok())
            .or_else(|| {
                (!model.accelerator_arn.is_empty()).then(|| model.accelerator_arn.clone())
            });
        owner.map(StabilizationTarget::Owner).ok_or_else(|| {
            "Listener ARN or accelerator ARN is required to track progress".to_string()
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
        request: &HandlerRequest<ListenerModel>,
        next_token: Option<&str>,
    ) -> Result<ListPage<ListenerModel>, ApiError> {
        let page = self
            .api
            .list_listeners(&request.desired_resource_state.accelerator_arn, next_token)
            .await?;
        Ok(ListPage {
            resource_models: page.items.iter().map(ListenerModel::from_observed).collect(),
            next_token: page.next_token,
        })
    }
}
