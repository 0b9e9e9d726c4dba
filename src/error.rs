//! Error types for the deployment lifecycle.
//!
//! No `anyhow` leakage. Explicit, typed errors. Plugin failures travel
//! through the guarded operations unchanged.

use crate::registry::PluginFamily;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("no such {family}: {name}")]
    UnknownPlugin { family: PluginFamily, name: String },

    #[error("{family} already registered: {name}")]
    DuplicatePlugin { family: PluginFamily, name: String },

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("teardown failed: {0}")]
    Teardown(String),

    #[error("operation not supported by this provider: {operation}")]
    Unsupported { operation: &'static str },

    #[error("deployment not found: {0}")]
    DeploymentNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Arbitrary plugin-domain failure, displayed as-is.
    #[error(transparent)]
    Plugin(Box<dyn std::error::Error + Send + Sync>),
}

impl DeployError {
    /// Wrap a plugin's own error type.
    pub fn plugin(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Plugin(Box::new(err))
    }

    /// Whether this error might be recoverable by retry.
    ///
    /// The core itself never retries; this is advice for callers.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeployError::Timeout(_) | DeployError::Storage(_))
    }

    /// Whether the error comes from a registry miss.
    pub fn is_unknown_plugin(&self) -> bool {
        matches!(self, DeployError::UnknownPlugin { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeployError::UnknownPlugin {
            family: PluginFamily::Engine,
            name: "NoSuchThing".to_string(),
        };
        assert_eq!(err.to_string(), "no such deployment engine: NoSuchThing");

        let err = DeployError::UnknownPlugin {
            family: PluginFamily::Provider,
            name: "Nope".to_string(),
        };
        assert_eq!(err.to_string(), "no such server provider: Nope");

        let err = DeployError::DuplicatePlugin {
            family: PluginFamily::Engine,
            name: "DummyEngine".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "deployment engine already registered: DummyEngine"
        );

        let err = DeployError::Provisioning("quota exceeded".to_string());
        assert_eq!(err.to_string(), "provisioning failed: quota exceeded");

        let err = DeployError::Teardown("vm stuck".to_string());
        assert_eq!(err.to_string(), "teardown failed: vm stuck");

        let err = DeployError::Unsupported {
            operation: "upload_image",
        };
        assert!(err.to_string().contains("upload_image"));

        let err = DeployError::DeploymentNotFound("u1".to_string());
        assert_eq!(err.to_string(), "deployment not found: u1");

        let err = DeployError::Timeout("deploy after 30s".to_string());
        assert_eq!(err.to_string(), "timeout: deploy after 30s");
    }

    #[test]
    fn test_plugin_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = DeployError::plugin(io);
        assert_eq!(err.to_string(), "socket closed");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(DeployError::Timeout("t".to_string()).is_recoverable());
        assert!(DeployError::Storage("s".to_string()).is_recoverable());

        assert!(!DeployError::Provisioning("p".to_string()).is_recoverable());
        assert!(!DeployError::Teardown("t".to_string()).is_recoverable());
        assert!(!DeployError::Cancelled("c".to_string()).is_recoverable());
        assert!(!DeployError::UnknownPlugin {
            family: PluginFamily::Provider,
            name: "x".to_string()
        }
        .is_recoverable());
    }
}
