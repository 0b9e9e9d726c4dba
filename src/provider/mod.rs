//! Server providers: plugins that create and destroy virtual machines and
//! the images they boot from.
//!
//! Unlike engines there is no status record at this layer. The factory
//! resolves the plugin, binds it to a task, and delegates; failures come
//! back to the caller as the plugin raised them.

mod dummy;

pub use dummy::DummyProvider;

use crate::error::DeployError;
use crate::operation::OperationControl;
use crate::registry::{PluginFamily, Registry};
use crate::types::{Image, ProviderContext, Server, TaskRef, VmRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The trait server provider plugins implement.
///
/// Image management is optional: providers that cannot manage images
/// keep the default bodies, which report `Unsupported`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Upload an image that new servers can boot from.
    ///
    /// `disk_format` is qcow2, raw, iso, ...; `container_format` is bare,
    /// ovf, aki, ...
    async fn upload_image(
        &self,
        _file_path: &Path,
        _disk_format: &str,
        _container_format: &str,
    ) -> Result<Image, DeployError> {
        Err(DeployError::Unsupported {
            operation: "upload_image",
        })
    }

    async fn destroy_image(&self, _image_id: &str) -> Result<(), DeployError> {
        Err(DeployError::Unsupported {
            operation: "destroy_image",
        })
    }

    /// Create `request.amount` servers. All or nothing: on failure no
    /// partial list is returned.
    async fn create_vms(&self, request: &VmRequest) -> Result<Vec<Server>, DeployError>;

    /// Destroy servers by id. Ids that are already gone are not an error.
    async fn destroy_vms(&self, vm_ids: &[String]) -> Result<(), DeployError>;
}

/// One provider bound to one task.
pub struct ProviderFactory {
    name: String,
    provider: Box<dyn Provider>,
    task: TaskRef,
    control: OperationControl,
}

impl ProviderFactory {
    /// Resolve `config["name"]` and build the provider for `task`.
    pub fn get_provider(
        registry: &Registry,
        config: &Value,
        task: TaskRef,
    ) -> Result<Self, DeployError> {
        let name = config
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| DeployError::Config("provider config has no \"name\"".into()))?;

        let constructor = registry.provider(name)?;
        let context = ProviderContext {
            config: config.clone(),
            task: task.clone(),
        };
        let provider = constructor(&context)?;
        debug!(provider = %name, task = %task, "provider ready");

        Ok(Self {
            name: name.to_string(),
            provider,
            task,
            control: OperationControl::new(),
        })
    }

    /// Names of every registered provider.
    pub fn available_providers(registry: &Registry) -> Vec<String> {
        registry.list(PluginFamily::Provider)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.control = self.control.with_cancellation(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.control = self.control.with_timeout(timeout);
        self
    }

    pub fn with_control(mut self, control: OperationControl) -> Self {
        self.control = control;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    pub async fn upload_image(
        &self,
        file_path: &Path,
        disk_format: &str,
        container_format: &str,
    ) -> Result<Image, DeployError> {
        let image = self
            .control
            .run(
                "upload_image",
                self.provider
                    .upload_image(file_path, disk_format, container_format),
            )
            .await
            .inspect_err(|e| self.log_failure("upload_image", e))?;
        info!(provider = %self.name, task = %self.task, image = %image.uuid(), "image uploaded");
        Ok(image)
    }

    pub async fn destroy_image(&self, image_id: &str) -> Result<(), DeployError> {
        self.control
            .run("destroy_image", self.provider.destroy_image(image_id))
            .await
            .inspect_err(|e| self.log_failure("destroy_image", e))?;
        info!(provider = %self.name, task = %self.task, image = %image_id, "image destroyed");
        Ok(())
    }

    /// Create servers. Returns exactly `request.amount` servers or fails.
    pub async fn create_vms(&self, request: VmRequest) -> Result<Vec<Server>, DeployError> {
        if request.amount == 0 {
            return Err(DeployError::InvalidRequest(
                "amount of servers must be at least 1".into(),
            ));
        }

        let servers = self
            .control
            .run("create_vms", self.provider.create_vms(&request))
            .await
            .inspect_err(|e| self.log_failure("create_vms", e))?;

        if servers.len() != request.amount {
            let err = DeployError::Provisioning(format!(
                "provider {} returned {} servers, expected {}",
                self.name,
                servers.len(),
                request.amount
            ));
            self.log_failure("create_vms", &err);
            self.release(&servers).await;
            return Err(err);
        }

        info!(
            provider = %self.name,
            task = %self.task,
            amount = servers.len(),
            "servers created"
        );
        Ok(servers)
    }

    pub async fn destroy_vms(&self, vm_ids: &[String]) -> Result<(), DeployError> {
        self.control
            .run("destroy_vms", self.provider.destroy_vms(vm_ids))
            .await
            .inspect_err(|e| self.log_failure("destroy_vms", e))?;
        info!(
            provider = %self.name,
            task = %self.task,
            amount = vm_ids.len(),
            "servers destroyed"
        );
        Ok(())
    }

    /// Best-effort destroy of servers the caller will never see.
    async fn release(&self, servers: &[Server]) {
        if servers.is_empty() {
            return;
        }
        let ids: Vec<String> = servers.iter().map(|s| s.uuid().to_string()).collect();
        if let Err(err) = self
            .control
            .run("destroy_vms", self.provider.destroy_vms(&ids))
            .await
        {
            warn!(
                provider = %self.name,
                task = %self.task,
                servers = ?ids,
                error = %err,
                "failed to release servers from rejected create_vms"
            );
        }
    }

    fn log_failure(&self, operation: &str, err: &DeployError) {
        error!(
            provider = %self.name,
            task = %self.task,
            operation,
            error = %err,
            "provider operation failed"
        );
    }
}

impl fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("name", &self.name)
            .field("task", &self.task)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}
