//! Provider that keeps its servers and images in memory.
//!
//! Nothing is booted. Useful for wiring tests and for dry runs of the
//! code that consumes providers.

use crate::error::DeployError;
use crate::provider::Provider;
use crate::registry::ProviderConstructor;
use crate::types::{Image, ProviderContext, Server, TaskRef, VmRequest};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inventory {
    next_id: u64,
    servers: BTreeSet<String>,
    images: BTreeSet<String>,
}

/// In-memory provider.
///
/// Config keys: `user` (default `root`), `key` (default empty).
#[derive(Debug)]
pub struct DummyProvider {
    task: TaskRef,
    user: String,
    key: String,
    inventory: Mutex<Inventory>,
}

impl DummyProvider {
    pub const NAME: &'static str = "DummyProvider";

    pub fn new(context: &ProviderContext) -> Self {
        let get = |key: &str, default: &str| {
            context
                .config
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            task: context.task.clone(),
            user: get("user", "root"),
            key: get("key", ""),
            inventory: Mutex::new(Inventory::default()),
        }
    }

    pub fn constructor() -> ProviderConstructor {
        Arc::new(|context: &ProviderContext| {
            Ok(Box::new(DummyProvider::new(context)) as Box<dyn Provider>)
        })
    }

    /// Ids of servers currently alive.
    pub fn servers(&self) -> Result<Vec<String>, DeployError> {
        Ok(self.lock()?.servers.iter().cloned().collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inventory>, DeployError> {
        self.inventory
            .lock()
            .map_err(|_| DeployError::Provisioning("dummy inventory lock poisoned".into()))
    }
}

#[async_trait]
impl Provider for DummyProvider {
    async fn upload_image(
        &self,
        file_path: &Path,
        disk_format: &str,
        container_format: &str,
    ) -> Result<Image, DeployError> {
        let mut inventory = self.lock()?;
        inventory.next_id += 1;
        let stem = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let uuid = format!("{}-{}-{}", self.task, stem, inventory.next_id);
        inventory.images.insert(uuid.clone());
        Ok(Image::new(uuid, disk_format, container_format))
    }

    async fn destroy_image(&self, image_id: &str) -> Result<(), DeployError> {
        self.lock()?.images.remove(image_id);
        Ok(())
    }

    async fn create_vms(&self, request: &VmRequest) -> Result<Vec<Server>, DeployError> {
        let mut inventory = self.lock()?;

        if let Some(image_id) = &request.image_id {
            if !inventory.images.contains(image_id) {
                return Err(DeployError::Provisioning(format!(
                    "unknown image: {}",
                    image_id
                )));
            }
        }

        let mut servers = Vec::with_capacity(request.amount);
        for _ in 0..request.amount {
            inventory.next_id += 1;
            let id = inventory.next_id;
            let uuid = format!("{}-vm-{}", self.task, id);
            inventory.servers.insert(uuid.clone());
            servers.push(Server::new(
                uuid,
                format!("192.0.2.{}", id % 254 + 1),
                self.user.clone(),
                self.key.clone(),
            ));
        }
        Ok(servers)
    }

    async fn destroy_vms(&self, vm_ids: &[String]) -> Result<(), DeployError> {
        let mut inventory = self.lock()?;
        for id in vm_ids {
            inventory.servers.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> DummyProvider {
        DummyProvider::new(&ProviderContext {
            config: json!({"name": "DummyProvider", "user": "ubuntu"}),
            task: TaskRef::new("t1"),
        })
    }

    #[tokio::test]
    async fn test_create_and_destroy() {
        let provider = provider();
        let servers = provider
            .create_vms(&VmRequest::new().with_amount(2))
            .await
            .unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].user(), "ubuntu");
        assert_eq!(provider.servers().unwrap().len(), 2);

        let ids: Vec<String> = servers.iter().map(|s| s.uuid().to_string()).collect();
        provider.destroy_vms(&ids).await.unwrap();
        assert!(provider.servers().unwrap().is_empty());
        provider.destroy_vms(&ids).await.unwrap();
    }

    #[tokio::test]
    async fn test_image_lifecycle() {
        let provider = provider();
        let image = provider
            .upload_image(Path::new("/images/cirros.qcow2"), "qcow2", "bare")
            .await
            .unwrap();
        assert!(image.uuid().contains("cirros"));
        assert_eq!(image.disk_format(), "qcow2");
        assert_eq!(image.container_format(), "bare");

        let servers = provider
            .create_vms(&VmRequest::new().with_image(image.uuid()))
            .await
            .unwrap();
        assert_eq!(servers.len(), 1);

        provider.destroy_image(image.uuid()).await.unwrap();
        let err = provider
            .create_vms(&VmRequest::new().with_image(image.uuid()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Provisioning(_)));
    }
}
