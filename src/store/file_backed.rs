//! File-backed deployment store.
//!
//! Stores each deployment record as `{uuid}/deployment.json` under
//! `~/.rally-deploy/deployments/`.

use crate::error::DeployError;
use crate::store::{DeploymentRecord, DeploymentStore, DeploymentUpdate, NewDeployment};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

const RECORD_FILE: &str = "deployment.json";

/// File-backed implementation of [`DeploymentStore`].
///
/// Each deployment is stored as `{deployments_dir}/{uuid}/deployment.json`.
/// Writes go through a temporary file and a rename, and read-modify-write
/// cycles are serialised within the process.
pub struct FileDeploymentStore {
    deployments_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDeploymentStore {
    /// Create a store using the default directory (`~/.rally-deploy/deployments`).
    pub async fn new_default() -> Result<Self, DeployError> {
        Self::new(default_deployments_dir()?).await
    }

    /// Create a store at a custom directory path.
    pub async fn new(deployments_dir: PathBuf) -> Result<Self, DeployError> {
        tokio::fs::create_dir_all(&deployments_dir)
            .await
            .map_err(|e| {
                DeployError::Storage(format!("failed to create deployments dir: {}", e))
            })?;

        Ok(Self {
            deployments_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.deployments_dir
    }

    fn uuid_dir(&self, uuid: &str) -> PathBuf {
        self.deployments_dir.join(uuid)
    }

    fn record_path(&self, uuid: &str) -> PathBuf {
        self.uuid_dir(uuid).join(RECORD_FILE)
    }

    async fn read(&self, uuid: &str) -> Result<Option<DeploymentRecord>, DeployError> {
        let path = self.record_path(uuid);

        if tokio::fs::metadata(&path).await.is_err() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DeployError::Storage(format!("failed to read record: {}", e)))?;

        let record = serde_json::from_str(&content)
            .map_err(|e| DeployError::Storage(format!("failed to parse record: {}", e)))?;

        Ok(Some(record))
    }

    async fn write(&self, record: &DeploymentRecord) -> Result<(), DeployError> {
        let dir = self.uuid_dir(&record.uuid);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DeployError::Storage(format!("failed to create record dir: {}", e)))?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| DeployError::Storage(format!("failed to serialize record: {}", e)))?;

        let tmp = dir.join(format!("{}.tmp", RECORD_FILE));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| DeployError::Storage(format!("failed to write record: {}", e)))?;
        tokio::fs::rename(&tmp, self.record_path(&record.uuid))
            .await
            .map_err(|e| DeployError::Storage(format!("failed to commit record: {}", e)))?;

        Ok(())
    }
}

/// `~/.rally-deploy/deployments`
pub fn default_deployments_dir() -> Result<PathBuf, DeployError> {
    let home = dirs::home_dir()
        .ok_or_else(|| DeployError::Storage("could not determine home directory".into()))?;
    Ok(home.join(".rally-deploy").join("deployments"))
}

#[async_trait]
impl DeploymentStore for FileDeploymentStore {
    async fn create(&self, attributes: NewDeployment) -> Result<DeploymentRecord, DeployError> {
        let _guard = self.write_lock.lock().await;
        let record = attributes.into_record();

        if self.read(&record.uuid).await?.is_some() {
            return Err(DeployError::Storage(format!(
                "deployment {} already exists",
                record.uuid
            )));
        }

        self.write(&record).await?;
        Ok(record)
    }

    async fn get(&self, uuid: &str) -> Result<DeploymentRecord, DeployError> {
        self.read(uuid)
            .await?
            .ok_or_else(|| DeployError::DeploymentNotFound(uuid.to_string()))
    }

    async fn update(
        &self,
        uuid: &str,
        changes: DeploymentUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read(uuid)
            .await?
            .ok_or_else(|| DeployError::DeploymentNotFound(uuid.to_string()))?;

        record.apply(changes);
        self.write(&record).await?;
        Ok(record)
    }

    async fn delete(&self, uuid: &str) -> Result<(), DeployError> {
        let _guard = self.write_lock.lock().await;
        let dir = self.uuid_dir(uuid);
        if tokio::fs::metadata(&dir).await.is_ok() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| DeployError::Storage(format!("failed to delete record: {}", e)))?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DeploymentRecord>, DeployError> {
        let mut records = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.deployments_dir)
            .await
            .map_err(|e| DeployError::Storage(format!("failed to read deployments dir: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DeployError::Storage(format!("failed to read dir entry: {}", e)))?
        {
            let path = entry.path().join(RECORD_FILE);
            if let Ok(content) = tokio::fs::read_to_string(&path).await {
                if let Ok(record) = serde_json::from_str::<DeploymentRecord>(&content) {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });
        Ok(records)
    }
}
