//! Engine that deploys nothing and hands back an existing cloud.
//!
//! Put the endpoint of the already running cloud under `cloud_config` in
//! the deployment config:
//!
//! ```json
//! {
//!     "name": "DummyEngine",
//!     "cloud_config": {
//!         "identity": {"url": "http://localhost/", "admin_user": "admin"}
//!     }
//! }
//! ```

use crate::engine::Engine;
use crate::error::DeployError;
use crate::registry::EngineConstructor;
use crate::store::DeploymentRecord;
use crate::types::Endpoint;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct DummyEngine;

impl DummyEngine {
    pub const NAME: &'static str = "DummyEngine";

    pub fn new() -> Self {
        Self
    }

    pub fn constructor() -> EngineConstructor {
        Arc::new(|_record: &DeploymentRecord| Ok(Box::new(DummyEngine::new()) as Box<dyn Engine>))
    }
}

#[async_trait]
impl Engine for DummyEngine {
    async fn deploy(&mut self, deployment: &DeploymentRecord) -> Result<Endpoint, DeployError> {
        Ok(deployment
            .config
            .get("cloud_config")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    async fn cleanup(&mut self, _deployment: &DeploymentRecord) -> Result<(), DeployError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewDeployment;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_cloud_config() {
        let record = NewDeployment::new()
            .with_config(json!({
                "name": "DummyEngine",
                "cloud_config": {"identity": {"url": "http://localhost/"}}
            }))
            .into_record();
        let endpoint = DummyEngine::new().deploy(&record).await.unwrap();
        assert_eq!(endpoint, json!({"identity": {"url": "http://localhost/"}}));
    }

    #[tokio::test]
    async fn test_missing_cloud_config_is_empty() {
        let record = NewDeployment::new().into_record();
        let mut engine = DummyEngine::new();
        assert_eq!(engine.deploy(&record).await.unwrap(), json!({}));
        engine.cleanup(&record).await.unwrap();
    }
}
