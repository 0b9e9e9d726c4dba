//! [`DeploymentStore`] trait definition.

use crate::error::DeployError;
use crate::store::{DeploymentRecord, DeploymentUpdate, NewDeployment};
use async_trait::async_trait;

/// Trait for persisting deployment records indexed by uuid.
///
/// Each call is atomic on its own; there are no cross-call transactions.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Create a record. Fails if the uuid is already taken.
    async fn create(&self, attributes: NewDeployment) -> Result<DeploymentRecord, DeployError>;

    /// Load a record. Fails with `DeploymentNotFound` if missing.
    async fn get(&self, uuid: &str) -> Result<DeploymentRecord, DeployError>;

    /// Apply changed fields and return the updated record.
    async fn update(
        &self,
        uuid: &str,
        changes: DeploymentUpdate,
    ) -> Result<DeploymentRecord, DeployError>;

    /// Delete a record. Idempotent.
    async fn delete(&self, uuid: &str) -> Result<(), DeployError>;

    /// List all stored records.
    async fn list(&self) -> Result<Vec<DeploymentRecord>, DeployError>;
}
