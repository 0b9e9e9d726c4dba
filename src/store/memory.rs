//! In-memory deployment store.
//!
//! Data is lost when the process exits. Used by tests and for
//! short-lived runs where nothing needs to survive.

use crate::error::DeployError;
use crate::store::{DeploymentRecord, DeploymentStore, DeploymentUpdate, NewDeployment};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory implementation of [`DeploymentStore`].
///
/// Records are kept in insertion order so `list` is deterministic.
#[derive(Debug, Default)]
pub struct MemoryDeploymentStore {
    records: RwLock<Vec<DeploymentRecord>>,
}

impl MemoryDeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DeployError {
    DeployError::Storage("lock poisoned".into())
}

#[async_trait]
impl DeploymentStore for MemoryDeploymentStore {
    async fn create(&self, attributes: NewDeployment) -> Result<DeploymentRecord, DeployError> {
        let record = attributes.into_record();
        let mut records = self.records.write().map_err(|_| poisoned())?;

        if records.iter().any(|r| r.uuid == record.uuid) {
            return Err(DeployError::Storage(format!(
                "deployment {} already exists",
                record.uuid
            )));
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, uuid: &str) -> Result<DeploymentRecord, DeployError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        records
            .iter()
            .find(|r| r.uuid == uuid)
            .cloned()
            .ok_or_else(|| DeployError::DeploymentNotFound(uuid.to_string()))
    }

    async fn update(
        &self,
        uuid: &str,
        changes: DeploymentUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let record = records
            .iter_mut()
            .find(|r| r.uuid == uuid)
            .ok_or_else(|| DeployError::DeploymentNotFound(uuid.to_string()))?;

        record.apply(changes);
        Ok(record.clone())
    }

    async fn delete(&self, uuid: &str) -> Result<(), DeployError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.retain(|r| r.uuid != uuid);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DeploymentRecord>, DeployError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::DeployStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryDeploymentStore::new();

        let created = store
            .create(
                NewDeployment::new()
                    .with_uuid("u1")
                    .with_name("first")
                    .with_config(json!({"name": "DummyEngine"})),
            )
            .await
            .unwrap();
        assert_eq!(created.status, DeployStatus::DeployInit);
        assert_eq!(created.plugin_name(), Some("DummyEngine"));

        let updated = store
            .update("u1", DeploymentUpdate::status(DeployStatus::DeployStarted))
            .await
            .unwrap();
        assert_eq!(updated.status, DeployStatus::DeployStarted);
        assert_eq!(updated.name, "first");

        let loaded = store.get("u1").await.unwrap();
        assert_eq!(loaded, updated);

        store.delete("u1").await.unwrap();
        assert!(matches!(
            store.get("u1").await,
            Err(DeployError::DeploymentNotFound(_))
        ));

        // Delete idempotent
        store.delete("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate_uuid() {
        let store = MemoryDeploymentStore::new();
        store.create(NewDeployment::new().with_uuid("dup")).await.unwrap();
        assert!(store
            .create(NewDeployment::new().with_uuid("dup"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_memory_store_update_missing() {
        let store = MemoryDeploymentStore::new();
        let result = store
            .update("ghost", DeploymentUpdate::name("whatever"))
            .await;
        assert!(matches!(result, Err(DeployError::DeploymentNotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store_list_in_insertion_order() {
        let store = MemoryDeploymentStore::new();
        for uuid in ["c", "a", "b"] {
            store.create(NewDeployment::new().with_uuid(uuid)).await.unwrap();
        }
        let uuids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.uuid)
            .collect();
        assert_eq!(uuids, vec!["c", "a", "b"]);
    }
}
