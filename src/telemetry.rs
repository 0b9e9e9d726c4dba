//! Log subscriber setup for binaries embedding the deployment core.
//!
//! The library itself only emits `tracing` events; nothing is printed
//! until a subscriber is installed.

use crate::config::LoggingConfig;
use crate::error::DeployError;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `config.level`. Calling this twice is harmless;
/// the second call leaves the first subscriber in place.
pub fn init(config: &LoggingConfig) -> Result<(), DeployError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| DeployError::Config(format!("invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
