use super::*;
use crate::status::DeployStatus;
use serde_json::json;

fn make_test_record() -> DeploymentRecord {
    NewDeployment::new()
        .with_uuid("u1")
        .with_name("my-deploy")
        .with_config(json!({
            "name": "DummyEngine",
            "cloud_config": {"identity": {"url": "http://x"}}
        }))
        .into_record()
}

#[test]
fn test_new_deployment_defaults() {
    let record = NewDeployment::new().into_record();
    assert_eq!(record.status, DeployStatus::DeployInit);
    assert!(record.endpoint.is_none());
    assert_eq!(record.config, json!({}));
    assert!(uuid::Uuid::parse_str(&record.uuid).is_ok());
    assert_eq!(record.created_at, record.updated_at);
}

#[test]
fn test_generated_uuids_are_distinct() {
    let a = NewDeployment::new().into_record();
    let b = NewDeployment::new().into_record();
    assert_ne!(a.uuid, b.uuid);
}

#[test]
fn test_apply_only_touches_given_fields() {
    let mut record = make_test_record();
    let config = record.config.clone();

    record.apply(DeploymentUpdate::status(DeployStatus::DeployStarted));
    assert_eq!(record.status, DeployStatus::DeployStarted);
    assert_eq!(record.name, "my-deploy");
    assert_eq!(record.config, config);

    record.apply(DeploymentUpdate::name("renamed"));
    assert_eq!(record.name, "renamed");
    assert_eq!(record.status, DeployStatus::DeployStarted);
}

#[test]
fn test_update_is_empty() {
    assert!(DeploymentUpdate::default().is_empty());
    assert!(!DeploymentUpdate::config(json!({})).is_empty());
}

#[test]
fn test_plugin_name() {
    assert_eq!(make_test_record().plugin_name(), Some("DummyEngine"));
    let record = NewDeployment::new()
        .with_config(json!({"name": 42}))
        .into_record();
    assert_eq!(record.plugin_name(), None);
}

#[test]
fn test_record_serialization() {
    let mut record = make_test_record();
    record.apply(DeploymentUpdate::endpoint(json!({"identity": {"url": "http://x"}})));

    let json = serde_json::to_string_pretty(&record).unwrap();
    assert!(json.contains("\"deploy->init\""));

    let deserialized: DeploymentRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, record);
}
