//! Deployment engines and the status machine around them.
//!
//! An engine is a plugin that knows how to bring a cloud up (`deploy`) and
//! tear it down (`cleanup`). It knows nothing about status tracking. The
//! [`EngineFactory`] wraps one engine bound to one deployment record and
//! moves the record's status as the engine runs:
//!
//! ```text
//! make_deploy:   deploy->started ──▶ deploy->finished
//!                       │
//!                       └──────────▶ deploy->failed
//!
//! make_cleanup:  cleanup->started ──▶ cleanup->finished
//!                       │
//!                       └──────────▶ cleanup->failed
//!
//! with_guard:    any error or panic out of the body ──▶ deploy->inconsistent
//! ```
//!
//! Plugin errors always reach the caller unchanged; a plugin panic counts as
//! a plugin error. If recording a failure status itself fails, that
//! secondary fault is logged and dropped. If the plugin succeeded but the
//! `*_finished` write fails, the record is forced to `deploy->inconsistent`.

mod dummy;

pub use dummy::DummyEngine;

use crate::deployment::Deployment;
use crate::error::DeployError;
use crate::operation::{panic_message, OperationControl};
use crate::registry::{PluginFamily, Registry};
use crate::status::DeployStatus;
use crate::store::DeploymentRecord;
use crate::types::Endpoint;
use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The trait deployment engine plugins implement.
///
/// `cleanup` must be safe to call after a failed or partial `deploy`.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Bring the cloud up and return how to reach it.
    async fn deploy(&mut self, deployment: &DeploymentRecord) -> Result<Endpoint, DeployError>;

    /// Tear the cloud down and free what it allocated.
    async fn cleanup(&mut self, deployment: &DeploymentRecord) -> Result<(), DeployError>;
}

/// Future returned by the body of [`EngineFactory::with_guard`].
pub type GuardFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// One engine bound to one deployment.
pub struct EngineFactory {
    name: String,
    engine: Box<dyn Engine>,
    deployment: Deployment,
    control: OperationControl,
}

impl EngineFactory {
    /// Resolve `name` and bind the engine to `deployment`.
    ///
    /// A deployment naming an engine that does not exist can never be
    /// deployed, so the record is marked `deploy->failed` before the
    /// `UnknownPlugin` error is returned. The same holds when the engine
    /// refuses to build from the deployment's config.
    pub async fn get_engine(
        registry: &Registry,
        name: &str,
        mut deployment: Deployment,
    ) -> Result<Self, DeployError> {
        let built = registry
            .engine(name)
            .and_then(|constructor| constructor(deployment.record()));

        match built {
            Ok(engine) => Ok(Self {
                name: name.to_string(),
                engine,
                deployment,
                control: OperationControl::new(),
            }),
            Err(err) => {
                error!(
                    deployment = %deployment.uuid(),
                    engine = %name,
                    error = %err,
                    "deploy engine unavailable"
                );
                record_failure(&mut deployment, DeployStatus::DeployFailed).await;
                Err(err)
            }
        }
    }

    /// Names of every registered engine.
    pub fn available_engines(registry: &Registry) -> Vec<String> {
        registry.list(PluginFamily::Engine)
    }

    /// Abort plugin calls when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.control = self.control.with_cancellation(token);
        self
    }

    /// Fail plugin calls that run longer than `timeout`.
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

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn deployment_mut(&mut self) -> &mut Deployment {
        &mut self.deployment
    }

    pub fn into_deployment(self) -> Deployment {
        self.deployment
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        self.control.cancellation_token()
    }

    /// Run the engine's `deploy` with status tracking.
    ///
    /// Returns the endpoint exactly as the engine produced it. Persisting
    /// it on the record is the caller's decision.
    pub async fn make_deploy(&mut self) -> Result<Endpoint, DeployError> {
        info!(
            deployment = %self.deployment.uuid(),
            engine = %self.name,
            "deploy started"
        );
        self.deployment
            .update_status(DeployStatus::DeployStarted)
            .await?;

        let record = self.deployment.record().clone();
        let result = self
            .control
            .run("deploy", self.engine.deploy(&record))
            .await;

        match result {
            Ok(endpoint) => {
                self.finish(DeployStatus::DeployFinished).await?;
                info!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    "deploy finished"
                );
                Ok(endpoint)
            }
            Err(err) => {
                error!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    error = %err,
                    "deploy failed"
                );
                record_failure(&mut self.deployment, DeployStatus::DeployFailed).await;
                Err(err)
            }
        }
    }

    /// Run the engine's `cleanup` with status tracking.
    pub async fn make_cleanup(&mut self) -> Result<(), DeployError> {
        info!(
            deployment = %self.deployment.uuid(),
            engine = %self.name,
            "cleanup started"
        );
        self.deployment
            .update_status(DeployStatus::CleanupStarted)
            .await?;

        let record = self.deployment.record().clone();
        let result = self
            .control
            .run("cleanup", self.engine.cleanup(&record))
            .await;

        match result {
            Ok(()) => {
                self.finish(DeployStatus::CleanupFinished).await?;
                info!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    "cleanup finished"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    error = %err,
                    "cleanup failed"
                );
                record_failure(&mut self.deployment, DeployStatus::CleanupFailed).await;
                Err(err)
            }
        }
    }

    /// Run `body` against this engine; any error escaping it marks the
    /// deployment `deploy->inconsistent`.
    ///
    /// Use this around everything done to a live deployment outside
    /// `make_deploy`/`make_cleanup`. On success the body's value is
    /// returned untouched; on failure the body's error is returned after
    /// the status change. A panic in the body also marks the deployment
    /// inconsistent and then keeps unwinding.
    ///
    /// ```ignore
    /// let endpoint = engine
    ///     .with_guard(|engine| {
    ///         Box::pin(async move {
    ///             let endpoint = engine.make_deploy().await?;
    ///             engine.deployment_mut().update_endpoint(endpoint.clone()).await?;
    ///             Ok::<_, DeployError>(endpoint)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_guard<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: for<'a> FnOnce(&'a mut EngineFactory) -> GuardFuture<'a, T, E>,
        E: fmt::Display,
    {
        let outcome = AssertUnwindSafe(body(self)).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                error!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    error = %err,
                    "unhandled error in guarded deployment scope"
                );
                self.mark_inconsistent().await;
                Err(err)
            }
            Err(payload) => {
                error!(
                    deployment = %self.deployment.uuid(),
                    engine = %self.name,
                    panic = %panic_message(&*payload),
                    "panic in guarded deployment scope"
                );
                self.mark_inconsistent().await;
                panic::resume_unwind(payload)
            }
        }
    }

    /// Record a `*_finished` status after the plugin succeeded.
    ///
    /// If that write fails the record would stay "started", so it is forced
    /// to `deploy->inconsistent` before the storage error is returned.
    async fn finish(&mut self, status: DeployStatus) -> Result<(), DeployError> {
        if let Err(err) = self.deployment.update_status(status).await {
            error!(
                deployment = %self.deployment.uuid(),
                engine = %self.name,
                status = %status,
                error = %err,
                "plugin succeeded but status could not be recorded"
            );
            self.mark_inconsistent().await;
            return Err(err);
        }
        Ok(())
    }

    /// Force `deploy->inconsistent`. Never fails; a store error is logged.
    pub async fn mark_inconsistent(&mut self) {
        warn!(
            deployment = %self.deployment.uuid(),
            engine = %self.name,
            "deployment marked inconsistent, manual inspection required"
        );
        record_failure(&mut self.deployment, DeployStatus::DeployInconsistent).await;
    }
}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFactory")
            .field("name", &self.name)
            .field("deployment", &self.deployment)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// Move a deployment to a failure status while some other error is
/// already on its way to the caller.
pub(crate) async fn record_failure(deployment: &mut Deployment, status: DeployStatus) {
    if let Err(secondary) = deployment.update_status(status).await {
        error!(
            deployment = %deployment.uuid(),
            status = %status,
            error = %secondary,
            "failed to record deployment status"
        );
    }
}
