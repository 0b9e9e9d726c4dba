//! Rally Deploy Library
//!
//! Lifecycle core for provisioning a target cloud through pluggable
//! deployment engines and server providers, with the deployment's status
//! persisted at every step.
//!
//! # Design
//!
//! Engines and providers are plugins registered by name in a [`Registry`].
//! They do the actual provisioning and know nothing about status tracking.
//! The [`EngineFactory`] wraps an engine bound to one [`Deployment`] and
//! moves its persisted [`DeployStatus`] around every call, so a record is
//! never left "started" once control returns to the caller. Work done
//! against a live deployment outside the guarded calls runs through
//! [`EngineFactory::with_guard`], which marks the deployment inconsistent if
//! anything escapes.
//!
//! # Usage
//!
//! ```ignore
//! use rally_deploy::{Deployment, EngineFactory, MemoryDeploymentStore, NewDeployment, Registry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Registry::with_builtins();
//! let store = Arc::new(MemoryDeploymentStore::new());
//!
//! let deployment = Deployment::create(
//!     store,
//!     NewDeployment::new().with_config(json!({
//!         "name": "DummyEngine",
//!         "cloud_config": {"identity": {"url": "http://keystone:5000/v2.0"}}
//!     })),
//! )
//! .await?;
//!
//! let mut engine = EngineFactory::get_engine(&registry, "DummyEngine", deployment).await?;
//! engine
//!     .with_guard(|engine| {
//!         Box::pin(async move {
//!             let endpoint = engine.make_deploy().await?;
//!             engine.deployment_mut().update_endpoint(endpoint).await
//!         })
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod deployment;
pub mod engine;
pub mod error;
pub mod operation;
pub mod provider;
pub mod registry;
pub mod service;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export the main types at crate root for convenience
pub use config::{CoreConfig, LoggingConfig, OperationsConfig, StorageBackend, StorageConfig};
pub use deployment::Deployment;
pub use engine::{DummyEngine, Engine, EngineFactory, GuardFuture};
pub use error::{DeployError, Result};
pub use operation::{OperationControl, PluginPanic};
pub use provider::{DummyProvider, Provider, ProviderFactory};
pub use registry::{
    EngineConstructor, PluginFamily, PluginRegistry, ProviderConstructor, Registry,
};
pub use service::DeploymentService;
pub use status::DeployStatus;
#[cfg(feature = "file-storage")]
pub use store::FileDeploymentStore;
pub use store::{
    DeploymentRecord, DeploymentStore, DeploymentUpdate, MemoryDeploymentStore, NewDeployment,
};
pub use types::{Endpoint, Image, ProviderContext, Server, SshTarget, TaskRef, VmRequest};

pub use tokio_util::sync::CancellationToken;
