//! High-level deployment operations.
//!
//! Each operation resolves the engine named in the deployment config and
//! runs inside the engine's guard, so any failure past engine resolution
//! ends with the record in `deploy->inconsistent`.

use crate::config::{CoreConfig, OperationsConfig};
use crate::deployment::Deployment;
use crate::engine::{record_failure, EngineFactory};
use crate::error::DeployError;
use crate::registry::Registry;
use crate::status::DeployStatus;
use crate::store::{DeploymentRecord, DeploymentStore, NewDeployment};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

pub struct DeploymentService {
    registry: Registry,
    store: Arc<dyn DeploymentStore>,
    operations: OperationsConfig,
}

impl DeploymentService {
    pub fn new(registry: Registry, store: Arc<dyn DeploymentStore>) -> Self {
        Self {
            registry,
            store,
            operations: OperationsConfig::default(),
        }
    }

    /// Open the configured store and apply the configured limits.
    pub async fn from_config(registry: Registry, config: &CoreConfig) -> Result<Self, DeployError> {
        let store = config.storage.open().await?;
        Ok(Self::new(registry, store).with_operations(config.operations.clone()))
    }

    pub fn with_operations(mut self, operations: OperationsConfig) -> Self {
        self.operations = operations;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    /// Create a deployment from `config` and deploy it with the engine
    /// named by `config["name"]`. The endpoint is stored on the record.
    pub async fn create_deploy(&self, config: Value, name: &str) -> Result<Deployment, DeployError> {
        let deployment = Deployment::create(
            self.store.clone(),
            NewDeployment::new().with_name(name).with_config(config),
        )
        .await?;
        info!(deployment = %deployment.uuid(), name, "deployment created");

        let mut engine = self.engine_for(deployment).await?;
        engine
            .with_guard(|engine| {
                Box::pin(async move {
                    let endpoint = engine.make_deploy().await?;
                    engine.deployment_mut().update_endpoint(endpoint).await
                })
            })
            .await?;

        Ok(engine.into_deployment())
    }

    /// Clean up a deployment and delete its record.
    pub async fn destroy_deploy(&self, uuid: &str) -> Result<(), DeployError> {
        let deployment = Deployment::get(self.store.clone(), uuid).await?;

        let mut engine = self.engine_for(deployment).await?;
        engine
            .with_guard(|engine| Box::pin(async move { engine.make_cleanup().await }))
            .await?;

        engine.into_deployment().delete().await?;
        info!(deployment = %uuid, "deployment destroyed");
        Ok(())
    }

    /// Clean up and deploy again on the same record.
    pub async fn recreate_deploy(&self, uuid: &str) -> Result<Deployment, DeployError> {
        let deployment = Deployment::get(self.store.clone(), uuid).await?;

        let mut engine = self.engine_for(deployment).await?;
        engine
            .with_guard(|engine| {
                Box::pin(async move {
                    engine.make_cleanup().await?;
                    let endpoint = engine.make_deploy().await?;
                    engine.deployment_mut().update_endpoint(endpoint).await
                })
            })
            .await?;

        Ok(engine.into_deployment())
    }

    pub async fn get(&self, uuid: &str) -> Result<DeploymentRecord, DeployError> {
        self.store.get(uuid).await
    }

    pub async fn list(&self) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.store.list().await
    }

    async fn engine_for(&self, mut deployment: Deployment) -> Result<EngineFactory, DeployError> {
        let Some(name) = deployment.record().plugin_name().map(str::to_owned) else {
            error!(deployment = %deployment.uuid(), "deployment config names no engine");
            record_failure(&mut deployment, DeployStatus::DeployFailed).await;
            return Err(DeployError::Config(
                "deployment config has no \"name\"".into(),
            ));
        };

        Ok(EngineFactory::get_engine(&self.registry, &name, deployment)
            .await?
            .with_control(self.operations.control()))
    }
}
