//! Persisted representation of a deployment ([`DeploymentRecord`]), plus the
//! create/update payloads the store accepts.

use crate::status::DeployStatus;
use crate::types::Endpoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One provisioning target as the store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Opaque identifier. Never changes after creation.
    pub uuid: String,
    pub name: String,
    pub status: DeployStatus,
    /// Plugin-owned configuration. The core only reads `name`.
    pub config: Value,
    /// Set after a successful deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    /// Unix timestamp of creation.
    pub created_at: u64,
    /// Unix timestamp of last update.
    pub updated_at: u64,
}

impl DeploymentRecord {
    /// The plugin name recorded in the config, if any.
    pub fn plugin_name(&self) -> Option<&str> {
        self.config.get("name").and_then(Value::as_str)
    }

    /// Apply changed fields and bump `updated_at`.
    pub fn apply(&mut self, update: DeploymentUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(config) = update.config {
            self.config = config;
        }
        if let Some(endpoint) = update.endpoint {
            self.endpoint = Some(endpoint);
        }
        self.updated_at = current_unix_time();
    }
}

/// Attributes for a new record.
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub uuid: Option<String>,
    pub name: String,
    pub status: DeployStatus,
    pub config: Value,
}

impl NewDeployment {
    pub fn new() -> Self {
        Self {
            uuid: None,
            name: String::new(),
            status: DeployStatus::DeployInit,
            config: Value::Object(Default::default()),
        }
    }

    /// Use a caller-chosen identifier instead of a generated one.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_status(mut self, status: DeployStatus) -> Self {
        self.status = status;
        self
    }

    /// Materialise the record. Generates a v4 uuid when none was given.
    pub fn into_record(self) -> DeploymentRecord {
        let now = current_unix_time();
        DeploymentRecord {
            uuid: self
                .uuid
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            status: self.status,
            config: self.config,
            endpoint: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for NewDeployment {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields to change in one atomic update. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentUpdate {
    pub status: Option<DeployStatus>,
    pub name: Option<String>,
    pub config: Option<Value>,
    pub endpoint: Option<Endpoint>,
}

impl DeploymentUpdate {
    pub fn status(status: DeployStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn config(config: Value) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    pub fn endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint: Some(endpoint),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.name.is_none()
            && self.config.is_none()
            && self.endpoint.is_none()
    }
}

pub(crate) fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
