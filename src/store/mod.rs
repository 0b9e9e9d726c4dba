//! Persistence layer for deployment records.
//!
//! This module contains:
//! - [`DeploymentStore`] trait: create/get/update/delete by uuid
//! - [`MemoryDeploymentStore`]: process-local store for tests and short runs
//! - [`FileDeploymentStore`]: one JSON file per deployment
//! - [`DeploymentRecord`]: the persisted entity and its update payloads

mod memory;
mod record;
mod store;

#[cfg(feature = "file-storage")]
pub mod file_backed;

pub use memory::MemoryDeploymentStore;
pub use record::{DeploymentRecord, DeploymentUpdate, NewDeployment};
pub use store::DeploymentStore;

#[cfg(feature = "file-storage")]
pub use file_backed::{default_deployments_dir, FileDeploymentStore};

#[cfg(test)]
mod tests;
