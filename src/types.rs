//! Value types exchanged with plugins.
//!
//! Descriptors are immutable once built: fields are private and only
//! readable through accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Connection information returned by a successful deploy. Its shape is
/// owned by the engine that produced it.
pub type Endpoint = Value;

/// Default SSH port for created servers.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Where and how to open a remote session to a server.
///
/// Session management lives outside this crate; this is the handle a
/// session layer consumes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshTarget {
    host: String,
    user: String,
    port: u16,
    key: Option<String>,
    password: Option<String>,
}

impl SshTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshTarget")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A server created by a provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    uuid: String,
    ip: String,
    user: String,
    key: String,
    password: Option<String>,
    ssh: SshTarget,
}

impl Server {
    pub fn new(
        uuid: impl Into<String>,
        ip: impl Into<String>,
        user: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let ip = ip.into();
        let user = user.into();
        let key = key.into();
        let ssh = SshTarget {
            host: ip.clone(),
            user: user.clone(),
            port: DEFAULT_SSH_PORT,
            key: Some(key.clone()).filter(|k| !k.is_empty()),
            password: None,
        };
        Self {
            uuid: uuid.into(),
            ip,
            user,
            key,
            password: None,
            ssh,
        }
    }

    /// Attach a login password. Consumes the builder value, so a built
    /// server is never changed in place.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.ssh.password = Some(password.clone());
        self.password = Some(password);
        self
    }

    pub fn with_ssh_port(mut self, port: u16) -> Self {
        self.ssh.port = port;
        self
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn ssh(&self) -> &SshTarget {
        &self.ssh
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("uuid", &self.uuid)
            .field("ip", &self.ip)
            .field("user", &self.user)
            .field("ssh", &self.ssh)
            .finish_non_exhaustive()
    }
}

/// An image uploaded through a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    uuid: String,
    disk_format: String,
    container_format: String,
}

impl Image {
    pub fn new(
        uuid: impl Into<String>,
        disk_format: impl Into<String>,
        container_format: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            disk_format: disk_format.into(),
            container_format: container_format.into(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// qcow2, raw, iso, ...
    pub fn disk_format(&self) -> &str {
        &self.disk_format
    }

    /// bare, ovf, aki, ...
    pub fn container_format(&self) -> &str {
        &self.container_format
    }
}

/// Parameters for `create_vms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRequest {
    pub image_id: Option<String>,
    pub type_id: Option<String>,
    pub amount: usize,
}

impl VmRequest {
    pub fn new() -> Self {
        Self {
            image_id: None,
            type_id: None,
            amount: 1,
        }
    }

    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    pub fn with_type(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn with_amount(mut self, amount: usize) -> Self {
        self.amount = amount;
        self
    }
}

impl Default for VmRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// The task a provider works on behalf of. Opaque to the core; providers
/// use it for attribution and quota scoping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef(String);

impl TaskRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a provider constructor receives.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Full provider config, including the `name` key.
    pub config: Value,
    pub task: TaskRef,
}
