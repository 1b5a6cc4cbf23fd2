//! Deployment group tests

use rpc_models::{Action, DeploymentStatus};
use serde_json::{json, Value};
use swdeployer::clients::memory::BackendCall;
use swdeployer::deploy::properties::GroupProperties;
use swdeployer::deploy::SoftwareDeploymentGroup;
use swdeployer::errors::DeployError;
use swdeployer::signal::TempUrlOptions;

use crate::common::{details, resource, Fixture, CONFIG_ID};

fn group_properties(servers: Value, transport: &str) -> GroupProperties {
    serde_json::from_value(json!({
        "config": CONFIG_ID,
        "servers": servers,
        "input_values": {"foo": "bar"},
        "signal_transport": transport,
    }))
    .unwrap()
}

fn group(fx: &Fixture, properties: GroupProperties) -> SoftwareDeploymentGroup {
    SoftwareDeploymentGroup::new(
        resource("deploy_mysql"),
        properties,
        fx.clients.clone(),
        TempUrlOptions::default(),
    )
    .unwrap()
}

fn created_servers(fx: &Fixture) -> Vec<String> {
    let mut servers: Vec<String> = fx
        .backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::CreateDeployment(request) => Some(request.server_id),
            _ => None,
        })
        .collect();
    servers.sort();
    servers
}

#[test]
fn test_group_properties_validation() {
    let both: GroupProperties = serde_json::from_value(json!({
        "servers": {"server1": "uuid1"},
        "server": "uuid2",
    }))
    .unwrap();
    assert!(matches!(both.validate(), Err(DeployError::Validation(_))));

    let neither: GroupProperties = serde_json::from_value(json!({"config": CONFIG_ID})).unwrap();
    assert!(neither.validate().is_err());

    let fx = Fixture::new();
    let result = SoftwareDeploymentGroup::new(
        resource("deploy_mysql"),
        neither,
        fx.clients.clone(),
        TempUrlOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_build_members() {
    let fx = Fixture::new();
    let group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "NO_SIGNAL"),
    );

    assert_eq!(group.name(), "deploy_mysql");
    assert_eq!(group.resource_names(), ["server1", "server2"]);

    let template = group.build_resource_definition();
    assert!(template.server.is_none());
    assert_eq!(template.config.as_deref(), Some(CONFIG_ID));
    assert_eq!(template.actions, [Action::Create, Action::Update]);

    let nested = group.assemble_nested(&["server2".to_string(), "missing".to_string()]);
    assert_eq!(nested.len(), 1);
    assert_eq!(nested["server2"].server.as_deref(), Some("uuid2"));

    let member = group.member("server1").unwrap();
    assert_eq!(member.name(), "server1");
    assert_eq!(member.properties().server.as_deref(), Some("uuid1"));
    assert_eq!(member.properties().input_values, details(json!({"foo": "bar"})));
    assert_eq!(group.members().count(), 2);
}

#[test]
fn test_single_server_is_keyed_by_id() {
    let fx = Fixture::new();
    let properties: GroupProperties = serde_json::from_value(json!({
        "config": CONFIG_ID,
        "server": "uuid1",
    }))
    .unwrap();
    let group = group(&fx, properties);
    assert_eq!(group.resource_names(), ["uuid1"]);
}

#[tokio::test]
async fn test_group_create_fans_out() {
    let fx = Fixture::new();
    let mut group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "NO_SIGNAL"),
    );

    let handle = group.handle_create(&fx.ctx).await.unwrap();
    assert_eq!(handle.len(), 2);
    assert!(handle.values().all(|member| member.action == Action::Create));
    assert!(handle.values().all(|member| member.record.is_some()));
    assert_eq!(created_servers(&fx), ["uuid1", "uuid2"]);

    assert!(group.check_create_complete(&fx.ctx, &handle).await.unwrap());

    let codes = group.attribute(&fx.ctx, "deploy_status_codes").await.unwrap();
    assert_eq!(codes, json!({"server1": null, "server2": null}));
}

#[tokio::test]
async fn test_group_attributes_after_signals() {
    let fx = Fixture::new();
    let mut group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "TEMP_URL_SIGNAL"),
    );
    let handle = group.handle_create(&fx.ctx).await.unwrap();
    assert!(!group.check_create_complete(&fx.ctx, &handle).await.unwrap());

    group
        .signal(
            &fx.ctx,
            "server1",
            Some(details(json!({
                "deploy_stdout": "Thing happened on server1",
                "deploy_stderr": "",
                "deploy_status_code": 0,
            }))),
        )
        .await
        .unwrap();
    assert!(!group.check_create_complete(&fx.ctx, &handle).await.unwrap());

    group
        .signal(
            &fx.ctx,
            "server2",
            Some(details(json!({
                "deploy_stdout": "ok on server2",
                "deploy_status_code": 0,
            }))),
        )
        .await
        .unwrap();
    assert!(group.check_create_complete(&fx.ctx, &handle).await.unwrap());

    assert_eq!(
        group.attribute(&fx.ctx, "deploy_stdouts").await.unwrap(),
        json!({"server1": "Thing happened on server1", "server2": "ok on server2"})
    );
    assert_eq!(
        group.attribute(&fx.ctx, "deploy_stderrs").await.unwrap(),
        json!({"server1": "", "server2": null})
    );
    assert_eq!(
        group.attribute(&fx.ctx, "deploy_status_codes").await.unwrap(),
        json!({"server1": 0, "server2": 0})
    );

    let err = group.attribute(&fx.ctx, "deploy_stdout").await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidAttribute { .. }));

    let err = group.signal(&fx.ctx, "server9", None).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_group_member_failure() {
    let fx = Fixture::new();
    let mut group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "TEMP_URL_SIGNAL"),
    );
    let handle = group.handle_create(&fx.ctx).await.unwrap();

    let record = handle["server2"].record.clone().unwrap();
    fx.backend
        .set_status(&record.id, DeploymentStatus::Failed, "disk full");

    let err = group.check_create_complete(&fx.ctx, &handle).await.unwrap_err();
    assert_eq!(err.to_string(), "Deployment to server failed: disk full");
}

#[tokio::test]
async fn test_group_update_reconciles_members() {
    let fx = Fixture::new();
    let mut group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "NO_SIGNAL"),
    );
    let handle = group.handle_create(&fx.ctx).await.unwrap();
    assert!(group.check_create_complete(&fx.ctx, &handle).await.unwrap());
    let retired_id = handle["server1"].record.as_ref().unwrap().id.clone();
    fx.backend.clear_calls();

    let handle = group
        .handle_update(
            &fx.ctx,
            group_properties(json!({"server2": "uuid2", "server3": "uuid3"}), "NO_SIGNAL"),
        )
        .await
        .unwrap();

    assert_eq!(handle["server1"].action, Action::Delete);
    assert!(handle["server1"].record.is_none());
    assert_eq!(handle["server2"].action, Action::Update);
    assert_eq!(handle["server3"].action, Action::Create);
    assert_eq!(created_servers(&fx), ["uuid3"]);
    assert_eq!(fx.backend.deleted_deployments(), [retired_id.clone()]);
    assert!(fx.backend.deployment(&retired_id).is_none());

    assert!(group.check_update_complete(&fx.ctx, &handle).await.unwrap());
    assert_eq!(group.resource_names(), ["server2", "server3"]);
    assert!(group.member("server1").is_none());
    assert_eq!(group.members().count(), 2);
}

#[tokio::test]
async fn test_group_delete() {
    let fx = Fixture::new();
    let mut group = group(
        &fx,
        group_properties(json!({"server1": "uuid1", "server2": "uuid2"}), "TEMP_URL_SIGNAL"),
    );
    group.handle_create(&fx.ctx).await.unwrap();

    let handle = group.handle_delete(&fx.ctx).await.unwrap();
    assert!(handle.values().all(|member| member.record.is_none()));
    assert_eq!(fx.backend.deleted_deployments().len(), 2);
    assert!(group.check_delete_complete(&fx.ctx, &handle).await.unwrap());
    assert_eq!(fx.store.count("delete_container"), 2);
}
