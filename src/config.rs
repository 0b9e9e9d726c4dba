//! Configuration for the deployment core.

use crate::error::DeployError;
use crate::operation::OperationControl;
use crate::store::{DeploymentStore, MemoryDeploymentStore};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default config file looked up in the current directory.
pub const CONFIG_FILE: &str = "rally-deploy.toml";

/// Environment variable prefix; `__` separates nested keys.
pub const ENV_PREFIX: &str = "RALLY_DEPLOY_";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub operations: OperationsConfig,
}

impl CoreConfig {
    /// Load configuration from the default sources.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `rally-deploy.toml` in the current directory (if present)
    /// 3. Environment variables with the `RALLY_DEPLOY_` prefix
    pub fn load() -> Result<Self, DeployError> {
        Self::from_figment(Figment::new().merge(Toml::file(CONFIG_FILE)))
    }

    /// Load configuration from a specific TOML file, then the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        Self::from_figment(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn from_figment(figment: Figment) -> Result<Self, DeployError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| DeployError::Config(e.to_string()))
    }
}

/// Which store backs deployment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Record directory for the file backend. Defaults to
    /// `~/.rally-deploy/deployments`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Build the configured store.
    pub async fn open(&self) -> Result<Arc<dyn DeploymentStore>, DeployError> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryDeploymentStore::new())),
            StorageBackend::File => self.open_file().await,
        }
    }

    #[cfg(feature = "file-storage")]
    async fn open_file(&self) -> Result<Arc<dyn DeploymentStore>, DeployError> {
        use crate::store::FileDeploymentStore;

        let store = match &self.dir {
            Some(dir) => FileDeploymentStore::new(dir.clone()).await?,
            None => FileDeploymentStore::new_default().await?,
        };
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "file-storage"))]
    async fn open_file(&self) -> Result<Arc<dyn DeploymentStore>, DeployError> {
        Err(DeployError::Config(
            "file storage requested but the file-storage feature is disabled".into(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `rally_deploy=debug`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Limits applied to every plugin call.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OperationsConfig {
    /// No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl OperationsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Operation control with the configured limits and a fresh token.
    pub fn control(&self) -> OperationControl {
        match self.timeout() {
            Some(timeout) => OperationControl::new().with_timeout(timeout),
            None => OperationControl::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert!(config.storage.dir.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.operations.timeout().is_none());
        assert!(config.operations.control().timeout().is_none());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "rally-deploy-config-{}.toml",
            rand::random::<u32>()
        ));
        std::fs::write(
            &path,
            r#"
[storage]
backend = "memory"

[logging]
level = "rally_deploy=debug"
json = true

[operations]
timeout_secs = 90
"#,
        )
        .unwrap();

        let config = CoreConfig::from_file(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.level, "rally_deploy=debug");
        assert!(config.logging.json);
        assert_eq!(config.operations.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(
            config.operations.control().timeout(),
            Some(Duration::from_secs(90))
        );

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_bad_backend_is_config_error() {
        let path = std::env::temp_dir().join(format!(
            "rally-deploy-config-{}.toml",
            rand::random::<u32>()
        ));
        std::fs::write(&path, "[storage]\nbackend = \"postgres\"\n").unwrap();

        let err = CoreConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            dir: None,
        };
        let store = config.open().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_open_file_store() {
        let dir = std::env::temp_dir().join(format!("rally-deploy-test-{}", rand::random::<u32>()));
        let config = StorageConfig {
            backend: StorageBackend::File,
            dir: Some(dir.clone()),
        };
        let store = config.open().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(dir.exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}
