//! The deployment object: a store handle plus the latest record snapshot.
//!
//! All mutation goes through the store. After each update the snapshot is
//! replaced by what the store returned, so readers always see persisted
//! values rather than local edits.

use crate::error::DeployError;
use crate::status::DeployStatus;
use crate::store::{DeploymentRecord, DeploymentStore, DeploymentUpdate, NewDeployment};
use crate::types::Endpoint;
use serde_json::Value;
use std::sync::Arc;

pub struct Deployment {
    store: Arc<dyn DeploymentStore>,
    record: DeploymentRecord,
}

impl Deployment {
    /// Create a new record in `store`.
    pub async fn create(
        store: Arc<dyn DeploymentStore>,
        attributes: NewDeployment,
    ) -> Result<Self, DeployError> {
        let record = store.create(attributes).await?;
        Ok(Self { store, record })
    }

    /// Load an existing record.
    pub async fn get(store: Arc<dyn DeploymentStore>, uuid: &str) -> Result<Self, DeployError> {
        let record = store.get(uuid).await?;
        Ok(Self { store, record })
    }

    /// Delete a record without loading it first.
    pub async fn delete_by_uuid(store: &dyn DeploymentStore, uuid: &str) -> Result<(), DeployError> {
        store.delete(uuid).await
    }

    pub fn uuid(&self) -> &str {
        &self.record.uuid
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn status(&self) -> DeployStatus {
        self.record.status
    }

    pub fn config(&self) -> &Value {
        &self.record.config
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.record.endpoint.as_ref()
    }

    pub fn record(&self) -> &DeploymentRecord {
        &self.record
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    async fn update(&mut self, changes: DeploymentUpdate) -> Result<(), DeployError> {
        self.record = self.store.update(&self.record.uuid, changes).await?;
        Ok(())
    }

    pub async fn update_status(&mut self, status: DeployStatus) -> Result<(), DeployError> {
        self.update(DeploymentUpdate::status(status)).await
    }

    pub async fn update_name(&mut self, name: impl Into<String>) -> Result<(), DeployError> {
        self.update(DeploymentUpdate::name(name)).await
    }

    pub async fn update_config(&mut self, config: Value) -> Result<(), DeployError> {
        self.update(DeploymentUpdate::config(config)).await
    }

    pub async fn update_endpoint(&mut self, endpoint: Endpoint) -> Result<(), DeployError> {
        self.update(DeploymentUpdate::endpoint(endpoint)).await
    }

    /// Re-read the record from the store.
    pub async fn refresh(&mut self) -> Result<(), DeployError> {
        self.record = self.store.get(&self.record.uuid).await?;
        Ok(())
    }

    /// Delete the record. The handle is consumed.
    pub async fn delete(self) -> Result<(), DeployError> {
        self.store.delete(&self.record.uuid).await
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDeploymentStore;
    use serde_json::json;

    fn store() -> Arc<dyn DeploymentStore> {
        Arc::new(MemoryDeploymentStore::new())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let created = Deployment::create(
            store.clone(),
            NewDeployment::new().with_uuid("u1").with_name("lab"),
        )
        .await
        .unwrap();
        assert_eq!(created.uuid(), "u1");
        assert_eq!(created.status(), DeployStatus::DeployInit);

        let loaded = Deployment::get(store, "u1").await.unwrap();
        assert_eq!(loaded.name(), "lab");
    }

    #[tokio::test]
    async fn test_updates_are_persisted() {
        let store = store();
        let mut deployment = Deployment::create(store.clone(), NewDeployment::new())
            .await
            .unwrap();

        deployment
            .update_status(DeployStatus::DeployStarted)
            .await
            .unwrap();
        deployment.update_name("renamed").await.unwrap();
        deployment
            .update_config(json!({"name": "DummyEngine"}))
            .await
            .unwrap();
        deployment
            .update_endpoint(json!({"identity": {"url": "http://x"}}))
            .await
            .unwrap();

        let stored = store.get(deployment.uuid()).await.unwrap();
        assert_eq!(stored.status, DeployStatus::DeployStarted);
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.config, json!({"name": "DummyEngine"}));
        assert_eq!(stored.endpoint, Some(json!({"identity": {"url": "http://x"}})));
        assert_eq!(&stored, deployment.record());
    }

    #[tokio::test]
    async fn test_refresh_sees_external_changes() {
        let store = store();
        let mut deployment = Deployment::create(store.clone(), NewDeployment::new().with_uuid("r"))
            .await
            .unwrap();

        store
            .update("r", DeploymentUpdate::status(DeployStatus::CleanupFinished))
            .await
            .unwrap();
        assert_eq!(deployment.status(), DeployStatus::DeployInit);

        deployment.refresh().await.unwrap();
        assert_eq!(deployment.status(), DeployStatus::CleanupFinished);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store();
        let deployment = Deployment::create(store.clone(), NewDeployment::new().with_uuid("d1"))
            .await
            .unwrap();
        deployment.delete().await.unwrap();
        assert!(Deployment::get(store.clone(), "d1").await.is_err());

        Deployment::create(store.clone(), NewDeployment::new().with_uuid("d2"))
            .await
            .unwrap();
        Deployment::delete_by_uuid(store.as_ref(), "d2").await.unwrap();
        assert!(matches!(
            store.get("d2").await,
            Err(DeployError::DeploymentNotFound(_))
        ));
    }
}
