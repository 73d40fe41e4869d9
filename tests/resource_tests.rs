//! # Resource Handler Integration Tests
//!
//! Resource-specific rules driven end to end through the driver: local
//! validation that rejects before any remote call, incremental child
//! collection updates, and parent preconditions.

mod common;

use common::*;
use globalaccelerator_reconciler::provider::{
    AttachmentResource, EndpointConfiguration, PortOverride, Tag,
};
use globalaccelerator_reconciler::{
    AcceleratorModel, CrossAccountAttachmentModel, EndpointGroupModel, FailureKind,
    HandlerRequest, InMemoryGlobalAccelerator, OperationKind, ProgressEvent,
};
use std::sync::Arc;

const BYOIP_MESSAGE: &str = "Updates for BYOIP IP addresses is not a supported operation. Delete existing accelerator and create new accelerator with updated IPs.";

fn failure_of<M>(event: &ProgressEvent<M>) -> Option<(FailureKind, &str)> {
    match event {
        ProgressEvent::Failed {
            error_code,
            message,
        } => Some((*error_code, message.as_str())),
        _ => None,
    }
}

#[tokio::test]
async fn test_invalid_tag_rejected_before_any_remote_call() {
    let api = control_plane();
    let mut model = accelerator_model("web");
    model.tags = Some(vec![Tag::new("bad#key", "v")]);

    let event = accelerator_driver(&api)
        .reconcile(OperationKind::Create, &HandlerRequest::new(model), None)
        .await
        .expect("validation failures are not faults");

    assert_eq!(
        failure_of(&event),
        Some((FailureKind::InvalidRequest, "Invalid tag format in template"))
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_reserved_tag_prefix_rejected() {
    let api = control_plane();
    let mut model = accelerator_model("web");
    model.tags = Some(vec![Tag::new("aws:cloudformation:stack-name", "x")]);

    let event = accelerator_driver(&api)
        .reconcile(OperationKind::Create, &HandlerRequest::new(model), None)
        .await
        .expect("validation failures are not faults");

    assert_eq!(
        failure_of(&event).map(|(kind, _)| kind),
        Some(FailureKind::InvalidRequest)
    );
    assert_eq!(api.accelerator_count(), 0);
}

#[tokio::test]
async fn test_byoip_change_rejected_on_update() {
    let api = control_plane();
    let model = deployed_accelerator(&api, "byoip").await;
    let before = api.mutation_count();

    let previous = AcceleratorModel {
        ip_addresses: Some(vec!["192.0.2.10".to_string()]),
        ..model.clone()
    };
    let desired = AcceleratorModel {
        ip_addresses: Some(vec!["192.0.2.20".to_string()]),
        ..model
    };
    let event = accelerator_driver(&api)
        .reconcile(
            OperationKind::Update,
            &HandlerRequest::new(desired).with_previous(previous),
            None,
        )
        .await
        .expect("validation failures are not faults");

    assert_eq!(
        failure_of(&event),
        Some((FailureKind::InvalidRequest, BYOIP_MESSAGE))
    );
    assert_eq!(api.mutation_count(), before);
}

#[tokio::test]
async fn test_tag_update_sends_only_the_delta() {
    let api = control_plane();
    let mut model = accelerator_model("tagged");
    model.tags = Some(vec![Tag::new("env", "dev"), Tag::new("team", "edge")]);
    let created = run_to_completion(
        &accelerator_driver(&api),
        OperationKind::Create,
        HandlerRequest::new(model),
    )
    .await
    .expect("create should not fault")
    .final_model();
    let arn = created.accelerator_arn.clone().expect("ARN");

    let desired = AcceleratorModel {
        tags: Some(vec![Tag::new("env", "dev"), Tag::new("owner", "net-ops")]),
        ..created.clone()
    };
    let run = run_to_completion(
        &accelerator_driver(&api),
        OperationKind::Update,
        HandlerRequest::new(desired).with_previous(created),
    )
    .await
    .expect("update should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));

    let mut tags = api.tags_of(&arn);
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(
        tags,
        vec![Tag::new("env", "dev"), Tag::new("owner", "net-ops")]
    );
    let calls = api.calls();
    assert_eq!(calls.iter().filter(|c| **c == "UntagResource").count(), 1);
    assert_eq!(calls.iter().filter(|c| **c == "TagResource").count(), 1);
}

#[tokio::test]
async fn test_tag_value_change_is_applied() {
    let api = control_plane();
    let mut model = accelerator_model("retagged");
    model.tags = Some(vec![Tag::new("env", "dev")]);
    let created = run_to_completion(
        &accelerator_driver(&api),
        OperationKind::Create,
        HandlerRequest::new(model),
    )
    .await
    .expect("create should not fault")
    .final_model();
    let arn = created.accelerator_arn.clone().expect("ARN");

    let desired = AcceleratorModel {
        tags: Some(vec![Tag::new("env", "prod")]),
        ..created.clone()
    };
    let run = run_to_completion(
        &accelerator_driver(&api),
        OperationKind::Update,
        HandlerRequest::new(desired).with_previous(created),
    )
    .await
    .expect("update should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));

    assert_eq!(api.tags_of(&arn), vec![Tag::new("env", "prod")]);
    let calls = api.calls();
    assert!(!calls.contains(&"UntagResource"));
    assert_eq!(calls.iter().filter(|c| **c == "TagResource").count(), 1);
}

#[tokio::test]
async fn test_listener_create_requires_accelerator() {
    let api = control_plane();
    let listener = tcp_listener(
        "arn:aws:globalaccelerator::123456789012:accelerator/1234abcd-abcd-1234-abcd-1234abcdef00",
        80,
    );

    let event = listener_driver(&api)
        .reconcile(OperationKind::Create, &HandlerRequest::new(listener), None)
        .await
        .expect("missing parent is not a fault");

    assert_eq!(
        failure_of(&event),
        Some((FailureKind::NotFound, "Accelerator not found."))
    );
    assert_eq!(api.mutation_count(), 0);
}

#[tokio::test]
async fn test_listener_lifecycle_watches_owner() {
    let api = control_plane();
    let accelerator = deployed_accelerator(&api, "web").await;
    let accelerator_arn = accelerator.accelerator_arn.expect("ARN");

    let listener = deployed_listener(&api, &accelerator_arn, 443).await;
    let listener_arn = listener.listener_arn.clone().expect("ARN");
    assert!(listener_arn.starts_with(&format!("{accelerator_arn}/listener/")));

    let run = run_to_completion(
        &listener_driver(&api),
        OperationKind::Delete,
        HandlerRequest::new(listener),
    )
    .await
    .expect("delete should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));
    assert!(!api.contains(&listener_arn));
    assert!(api.contains(&accelerator_arn));
}

fn endpoint_group(listener_arn: &str) -> EndpointGroupModel {
    EndpointGroupModel {
        listener_arn: listener_arn.to_string(),
        endpoint_group_region: "us-east-1".to_string(),
        endpoint_configurations: Some(vec![EndpointConfiguration {
            endpoint_id: "eipalloc-0123456789abcdef0".to_string(),
            weight: Some(128),
            client_ip_preservation_enabled: None,
        }]),
        ..EndpointGroupModel::default()
    }
}

#[tokio::test]
async fn test_endpoint_group_rejects_malformed_listener_arn() {
    let api = control_plane();
    let event = endpoint_group_driver(&api)
        .reconcile(
            OperationKind::Create,
            &HandlerRequest::new(endpoint_group("not-an-arn")),
            None,
        )
        .await
        .expect("validation failures are not faults");

    assert_eq!(
        failure_of(&event).map(|(kind, _)| kind),
        Some(FailureKind::InvalidRequest)
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_endpoint_group_requires_listener() {
    let api = control_plane();
    let accelerator = deployed_accelerator(&api, "web").await;
    let missing_listener = format!(
        "{}/listener/abcdef01",
        accelerator.accelerator_arn.expect("ARN")
    );

    let event = endpoint_group_driver(&api)
        .reconcile(
            OperationKind::Create,
            &HandlerRequest::new(endpoint_group(&missing_listener)),
            None,
        )
        .await
        .expect("missing parent is not a fault");

    assert_eq!(
        failure_of(&event),
        Some((FailureKind::NotFound, "Listener not found."))
    );
}

#[tokio::test]
async fn test_endpoint_group_update_clears_removed_overrides() {
    let api = control_plane();
    let accelerator = deployed_accelerator(&api, "web").await;
    let listener = deployed_listener(&api, &accelerator.accelerator_arn.expect("ARN"), 80).await;
    let listener_arn = listener.listener_arn.expect("ARN");

    let mut model = endpoint_group(&listener_arn);
    model.port_overrides = Some(vec![PortOverride {
        listener_port: 80,
        endpoint_port: 8080,
    }]);
    model.traffic_dial_percentage = Some(50.0);
    let created = run_to_completion(
        &endpoint_group_driver(&api),
        OperationKind::Create,
        HandlerRequest::new(model),
    )
    .await
    .expect("create should not fault")
    .final_model();
    let arn = created.endpoint_group_arn.clone().expect("ARN");
    assert_eq!(
        api.peek_endpoint_group(&arn).map(|g| g.port_overrides.len()),
        Some(1)
    );

    let desired = EndpointGroupModel {
        port_overrides: None,
        traffic_dial_percentage: None,
        ..created.clone()
    };
    let run = run_to_completion(
        &endpoint_group_driver(&api),
        OperationKind::Update,
        HandlerRequest::new(desired).with_previous(created),
    )
    .await
    .expect("update should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));

    let group = api.peek_endpoint_group(&arn).expect("group still exists");
    assert!(group.port_overrides.is_empty());
    assert_eq!(group.traffic_dial_percentage, Some(100.0));
}

#[tokio::test]
async fn test_endpoint_group_delete_of_absent_group_succeeds() {
    let api = control_plane();
    let accelerator = deployed_accelerator(&api, "web").await;
    let listener = deployed_listener(&api, &accelerator.accelerator_arn.expect("ARN"), 80).await;
    let listener_arn = listener.listener_arn.expect("ARN");

    let gone = EndpointGroupModel {
        endpoint_group_arn: Some(format!("{listener_arn}/endpoint-group/abcdef012345")),
        ..endpoint_group(&listener_arn)
    };
    let before = api.mutation_count();
    let event = endpoint_group_driver(&api)
        .reconcile(OperationKind::Delete, &HandlerRequest::new(gone), None)
        .await
        .expect("delete should not fault");

    assert!(matches!(event, ProgressEvent::Success { .. }));
    assert_eq!(api.mutation_count(), before);
}

fn attachment(principals: &[&str]) -> CrossAccountAttachmentModel {
    CrossAccountAttachmentModel {
        name: "shared-endpoints".to_string(),
        principals: Some(principals.iter().map(ToString::to_string).collect()),
        resources: Some(vec![AttachmentResource {
            endpoint_id: None,
            cidr: Some("203.0.113.0/24".to_string()),
            region: None,
        }]),
        ..CrossAccountAttachmentModel::default()
    }
}

#[tokio::test]
async fn test_attachment_update_swaps_principals() {
    let api = control_plane();
    let created = run_to_completion(
        &attachment_driver(&api),
        OperationKind::Create,
        HandlerRequest::new(attachment(&["111111111111", "ABCD"])),
    )
    .await
    .expect("create should not fault");
    // issue, then one poll that finds the attachment
    assert_eq!(created.events.len(), 2);
    let created = created.final_model();
    let arn = created.attachment_arn.clone().expect("ARN");

    let desired = CrossAccountAttachmentModel {
        attachment_arn: Some(arn.clone()),
        ..attachment(&["111111111111", "WXYZ"])
    };
    let run = run_to_completion(
        &attachment_driver(&api),
        OperationKind::Update,
        HandlerRequest::new(desired).with_previous(created),
    )
    .await
    .expect("update should not fault");
    assert!(matches!(run.last(), ProgressEvent::Success { .. }));

    let stored = api.peek_attachment(&arn).expect("attachment exists");
    assert_eq!(
        stored.principals,
        vec!["111111111111".to_string(), "WXYZ".to_string()]
    );
    assert_eq!(stored.resources.len(), 1);
}

#[tokio::test]
async fn test_attachment_resource_without_identity_rejected() {
    let api = control_plane();
    let mut model = attachment(&["111111111111"]);
    model.resources = Some(vec![
        AttachmentResource {
            endpoint_id: None,
            cidr: None,
            region: Some("us-east-1".to_string()),
        },
        AttachmentResource {
            endpoint_id: None,
            cidr: None,
            region: Some("eu-west-1".to_string()),
        },
    ]);

    let event = attachment_driver(&api)
        .reconcile(OperationKind::Create, &HandlerRequest::new(model), None)
        .await
        .expect("validation failures are not faults");

    assert_eq!(
        failure_of(&event).map(|(kind, _)| kind),
        Some(FailureKind::InvalidRequest)
    );
    assert!(api.calls().is_empty());
    assert_eq!(api.attachment_count(), 0);
}

#[tokio::test]
async fn test_attachment_delete_waits_for_disappearance() {
    let api = Arc::new(InMemoryGlobalAccelerator::new());
    let created = run_to_completion(
        &attachment_driver(&api),
        OperationKind::Create,
        HandlerRequest::new(attachment(&["111111111111"])),
    )
    .await
    .expect("create should not fault")
    .final_model();

    let run = run_to_completion(
        &attachment_driver(&api),
        OperationKind::Delete,
        HandlerRequest::new(created),
    )
    .await
    .expect("delete should not fault");

    assert!(matches!(run.last(), ProgressEvent::Success { .. }));
    assert_eq!(api.attachment_count(), 0);
}
