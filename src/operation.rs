//! Cancellation and time limits for plugin calls.
//!
//! Plugin calls are opaque and may block on the network for as long as
//! they like. Every call the core makes into a plugin is raced against a
//! cancellation token and an optional deadline; when either fires, the
//! plugin future is dropped and the call fails like any other plugin error.
//! A plugin that panics fails the call with [`PluginPanic`].

use crate::error::DeployError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A plugin call panicked instead of returning.
#[derive(Debug, thiserror::Error)]
#[error("{operation} panicked: {message}")]
pub struct PluginPanic {
    pub operation: &'static str,
    pub message: String,
}

impl PluginPanic {
    pub(crate) fn new(operation: &'static str, payload: &(dyn Any + Send)) -> Self {
        Self {
            operation,
            message: panic_message(payload),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationControl {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl OperationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Drive `call` to completion unless cancelled or out of time.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, DeployError>
    where
        F: Future<Output = Result<T, DeployError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled(operation.to_string()));
        }

        let call = AssertUnwindSafe(call).catch_unwind().map(|outcome| {
            outcome.unwrap_or_else(|payload| {
                Err(DeployError::plugin(PluginPanic::new(operation, &*payload)))
            })
        });

        let limited = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                    DeployError::Timeout(format!("{} exceeded {:?}", operation, limit))
                })?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeployError::Cancelled(operation.to_string())),
            result = limited => result,
        }
    }
}
