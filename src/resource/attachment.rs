//! # Cross-Account Attachment
//!
//! Attachments have no deployment status: once the control plane reports
//! one it is usable, and once it stops reporting it the delete is done.
//!
//! Updates are incremental. Principals (keyed by the principal string) and
//! resources (keyed by endpoint id, else CIDR) are diffed against what the
//! attachment currently holds, and only the delta is sent.

use crate::controller::diff::diff;
use crate::controller::idempotency::IdempotencyToken;
use crate::controller::reconciler::probe::observe;
use crate::controller::reconciler::{
    HandlerRequest, ListPage, Mutation, Observed, ObservedStatus, OperationKind, Prober,
    ResourceHandler, StabilizationTarget,
};
use crate::provider::{
    ApiError, Attachment, AttachmentResource, AttachmentSettings, AttachmentUpdate,
    GlobalAcceleratorApi, ResourceKind, Tag,
};
use crate::resource::tags::{apply_tag_delta, validate_tags};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Cross-account attachment resource model
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossAccountAttachmentModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_arn: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<AttachmentResource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

impl CrossAccountAttachmentModel {
    #[must_use]
    pub fn from_observed(attachment: &Attachment, tags: Option<Vec<Tag>>) -> Self {
        Self {
            attachment_arn: Some(attachment.arn.clone()),
            name: attachment.name.clone().unwrap_or_default(),
            principals: Some(attachment.principals.clone()),
            resources: Some(attachment.resources.clone()),
            tags,
        }
    }
}

/// Changes needed to turn `observed` into `desired`, excluding tags
#[must_use]
pub fn attachment_update(
    observed: &CrossAccountAttachmentModel,
    desired: &CrossAccountAttachmentModel,
) -> AttachmentUpdate {
    AttachmentUpdate {
        name: (observed.name != desired.name).then(|| desired.name.clone()),
        principals: diff(
            observed.principals.as_deref(),
            desired.principals.as_deref(),
            String::clone,
        ),
        resources: diff(
            observed.resources.as_deref(),
            desired.resources.as_deref(),
            |resource| resource.key().map(str::to_string),
        ),
    }
}

/// Every resource must carry an endpoint id or a CIDR to be diffable
fn validate_resources(resources: Option<&[AttachmentResource]>) -> Result<(), String> {
    if resources
        .unwrap_or_default()
        .iter()
        .any(|resource| resource.key().is_none())
    {
        return Err("Each attachment resource requires an EndpointId or a Cidr".to_string());
    }
    Ok(())
}

/// Handler for cross-account attachments
#[derive(Clone)]
pub struct AttachmentHandler {
    api: Arc<dyn GlobalAcceleratorApi>,
    prober: Prober,
}

impl fmt::Debug for AttachmentHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentHandler").finish_non_exhaustive()
    }
}

impl AttachmentHandler {
    pub fn new(api: Arc<dyn GlobalAcceleratorApi>) -> Self {
        let prober = Prober::new(Arc::clone(&api));
        Self { api, prober }
    }
}

#[async_trait]
impl ResourceHandler for AttachmentHandler {
    type Model = CrossAccountAttachmentModel;

    fn kind(&self) -> ResourceKind {
        ResourceKind::CrossAccountAttachment
    }

    fn identifier<'a>(&self, model: &'a CrossAccountAttachmentModel) -> Option<&'a str> {
        model.attachment_arn.as_deref()
    }

    async fn probe(
        &self,
        identifier: &str,
    ) -> Result<Observed<CrossAccountAttachmentModel>, ApiError> {
        let attachment = match self.prober.attachment(identifier).await? {
            Observed::Present(attachment) => attachment,
            Observed::Absent => return Ok(Observed::Absent),
        };
        let tags = observe(self.api.list_tags(identifier)).await?;
        Ok(tags.map(|tags| CrossAccountAttachmentModel::from_observed(&attachment, Some(tags))))
    }

    async fn create(
        &self,
        request: &HandlerRequest<CrossAccountAttachmentModel>,
        token: &IdempotencyToken,
    ) -> Result<Mutation<CrossAccountAttachmentModel>, ApiError> {
        let desired = &request.desired_resource_state;
        if let Err(e) = validate_tags(desired.tags.as_deref()) {
            return Ok(Mutation::invalid_request(e.to_string()));
        }
        if let Err(message) = validate_resources(desired.resources.as_deref()) {
            return Ok(Mutation::invalid_request(message));
        }

        let settings = AttachmentSettings {
            name: desired.name.clone(),
            principals: desired.principals.clone().unwrap_or_default(),
            resources: desired.resources.clone().unwrap_or_default(),
        };
        info!(name = %desired.name, "Creating cross-account attachment");
        let attachment = self
            .api
            .create_attachment(
                &settings,
                desired.tags.as_deref().unwrap_or_default(),
                token.as_str(),
            )
            .await?;

        let mut model = desired.clone();
        model.attachment_arn = Some(attachment.arn);
        Ok(Mutation::Issued(model))
    }

    async fn update(
        &self,
        request: &HandlerRequest<CrossAccountAttachmentModel>,
        observed: &CrossAccountAttachmentModel,
    ) -> Result<Mutation<CrossAccountAttachmentModel>, ApiError> {
        let desired = &request.desired_resource_state;
        if let Err(e) = validate_tags(desired.tags.as_deref()) {
            return Ok(Mutation::invalid_request(e.to_string()));
        }
        if let Err(message) = validate_resources(desired.resources.as_deref()) {
            return Ok(Mutation::invalid_request(message));
        }
        let Some(arn) = observed.attachment_arn.as_deref() else {
            return Ok(Mutation::not_found(
                ResourceKind::CrossAccountAttachment.not_found_message(),
            ));
        };

        let update = attachment_update(observed, desired);
        debug!(?update, "Computed attachment delta");
        if update.name.is_some() || !update.principals.is_empty() || !update.resources.is_empty()
        {
            info!(
                attachment = arn,
                add_principals = update.principals.to_add.len(),
                remove_principals = update.principals.to_remove.len(),
                add_resources = update.resources.to_add.len(),
                remove_resources = update.resources.to_remove.len(),
                "Updating cross-account attachment"
            );
            self.api.update_attachment(arn, &update).await?;
        }
        apply_tag_delta(
            self.api.as_ref(),
            arn,
            observed.tags.as_deref(),
            desired.tags.as_deref(),
        )
        .await?;

        let mut model = desired.clone();
        model.attachment_arn = Some(arn.to_string());
        Ok(Mutation::Issued(model))
    }

    async fn delete(&self, observed: &CrossAccountAttachmentModel) -> Result<(), ApiError> {
        if let Some(arn) = observed.attachment_arn.as_deref() {
            info!(attachment = arn, "Deleting cross-account attachment");
            observe(self.api.delete_attachment(arn)).await?;
        }
        Ok(())
    }

    fn stabilization_target(
        &self,
        model: &CrossAccountAttachmentModel,
    ) -> Result<StabilizationTarget, String> {
        model
            .attachment_arn
            .clone()
            .map(StabilizationTarget::Own)
            .ok_or_else(|| "Attachment ARN is required to track progress".to_string())
    }

    async fn observe(
        &self,
        operation: OperationKind,
        target: &StabilizationTarget,
    ) -> Result<ObservedStatus, ApiError> {
        let present = !self
            .prober
            .attachment(target.identifier())
            .await?
            .is_absent();
        Ok(match (operation, present) {
            (_, false) => ObservedStatus::Absent,
            (OperationKind::Delete, true) => ObservedStatus::Converging,
            (OperationKind::Create | OperationKind::Update, true) => ObservedStatus::Converged,
        })
    }

    async fn list(
        &self,
        _request: &HandlerRequest<CrossAccountAttachmentModel>,
        next_token: Option<&str>,
    ) -> Result<ListPage<CrossAccountAttachmentModel>, ApiError> {
        let page = self.api.list_attachments(next_token).await?;
        Ok(ListPage {
            resource_models: page
                .items
                .iter()
                .map(|attachment| CrossAccountAttachmentModel::from_observed(attachment, None))
                .collect(),
            next_token: page.next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(id: &str) -> AttachmentResource {
        AttachmentResource {
            endpoint_id: Some(id.to_string()),
            cidr: None,
            region: Some("us-east-1".to_string()),
        }
    }

    fn cidr(block: &str) -> AttachmentResource {
        AttachmentResource {
            endpoint_id: None,
            cidr: Some(block.to_string()),
            region: None,
        }
    }

    #[test]
    fn test_principal_delta() {
        let observed = CrossAccountAttachmentModel {
            name: "share".to_string(),
            principals: Some(vec![
                "111111111111".to_string(),
                "accelerator/ABCD".to_string(),
            ]),
            ..Default::default()
        };
        let desired = CrossAccountAttachmentModel {
            principals: Some(vec![
                "111111111111".to_string(),
                "accelerator/WXYZ".to_string(),
            ]),
            ..observed.clone()
        };

        let update = attachment_update(&observed, &desired);
        assert_eq!(update.name, None);
        assert_eq!(update.principals.to_add, vec!["accelerator/WXYZ".to_string()]);
        assert_eq!(update.principals.to_remove, vec!["accelerator/ABCD".to_string()]);
        assert!(update.resources.is_empty());
    }

    #[test]
    fn test_principal_match_does_not_affect_resources() {
        // the same string as a principal and as an endpoint id
        let shared = "arn:aws:ec2:us-east-1:111111111111:eip/eipalloc-1";
        let observed = CrossAccountAttachmentModel {
            name: "share".to_string(),
            principals: Some(vec![shared.to_string()]),
            resources: Some(Vec::new()),
            ..Default::default()
        };
        let desired = CrossAccountAttachmentModel {
            principals: Some(Vec::new()),
            resources: Some(vec![endpoint(shared)]),
            ..observed.clone()
        };

        let update = attachment_update(&observed, &desired);
        assert_eq!(update.principals.to_remove, vec![shared.to_string()]);
        assert!(update.principals.to_add.is_empty());
        assert_eq!(update.resources.to_add, vec![endpoint(shared)]);
        assert!(update.resources.to_remove.is_empty());
    }

    #[test]
    fn test_resources_without_identity_are_rejected() {
        let anonymous = AttachmentResource {
            endpoint_id: None,
            cidr: None,
            region: Some("us-east-1".to_string()),
        };
        assert!(validate_resources(Some(&[endpoint("eipalloc-1"), anonymous][..])).is_err());
        assert_eq!(validate_resources(Some(&[cidr("10.0.0.0/24")][..])), Ok(()));
        assert_eq!(validate_resources(None), Ok(()));
    }

    #[test]
    fn test_resource_delta_keys_on_endpoint_or_cidr() {
        let observed = CrossAccountAttachmentModel {
            name: "share".to_string(),
            resources: Some(vec![endpoint("eipalloc-1"), cidr("10.0.0.0/24")]),
            ..Default::default()
        };
        let mut moved = endpoint("eipalloc-1");
        moved.region = Some("eu-west-1".to_string());
        let desired = CrossAccountAttachmentModel {
            name: "renamed".to_string(),
            resources: Some(vec![moved, cidr("10.0.1.0/24")]),
            ..Default::default()
        };

        let update = attachment_update(&observed, &desired);
        assert_eq!(update.name.as_deref(), Some("renamed"));
        assert_eq!(update.resources.to_add, vec![cidr("10.0.1.0/24")]);
        assert_eq!(update.resources.to_remove, vec![cidr("10.0.0.0/24")]);
    }
}
