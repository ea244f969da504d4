//! Service lifecycle control.
//!
//! Starting, stopping and restarting services is delegated to an external
//! orchestration tool, scoped to the service's own directory.
//!
//! # Design
//!
//! The lifecycle trait is async and per-service:
//! - `start()` brings the service up
//! - `stop()` tears it down; calling it on a stopped service is not an error
//! - `restart_scaled()` recreates it with a given replica count
//!
//! Failures are returned as [`LifecycleError`] values. Callers skip the
//! affected service's measurement and carry on.

mod compose;
mod mock;

pub use compose::ComposeLifecycle;
pub use mock::{LifecycleCall, MockLifecycle};

use async_trait::async_trait;
use std::fmt;
use svcbench_types::ServiceIdentity;
use thiserror::Error;

/// A lifecycle operation, used for error reporting and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    /// Bring the service up.
    Start,
    /// Tear the service down.
    Stop,
    /// Recreate the service with a replica count.
    RestartScaled(u32),
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Start => write!(f, "start"),
            LifecycleAction::Stop => write!(f, "stop"),
            LifecycleAction::RestartScaled(replicas) => write!(f, "restart (x{})", replicas),
        }
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The orchestration program could not be spawned.
    #[error("{action} {service}: spawn failed: {source}")]
    Spawn {
        /// Service name.
        service: String,
        /// Attempted action.
        action: LifecycleAction,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The orchestration program exited unsuccessfully.
    #[error("{action} {service}: exit={exit_code}, stderr={stderr}")]
    Failed {
        /// Service name.
        service: String,
        /// Attempted action.
        action: LifecycleAction,
        /// Exit code (-1 if killed by a signal).
        exit_code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// The orchestration program did not finish in time and was killed.
    #[error("{action} {service}: timed out after {secs:.1}s")]
    Timeout {
        /// Service name.
        service: String,
        /// Attempted action.
        action: LifecycleAction,
        /// Timeout that elapsed, in seconds.
        secs: f64,
    },
}

/// Start/stop/restart for one service at a time.
///
/// Implementations receive the service's directory through the identity and
/// must not depend on the process working directory.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Bring the service up.
    async fn start(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError>;

    /// Tear the service down. Idempotent.
    async fn stop(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError>;

    /// Recreate the service with `replicas` instances.
    async fn restart_scaled(
        &self,
        identity: &ServiceIdentity,
        replicas: u32,
    ) -> Result<(), LifecycleError>;
}

/// Stop every service in order, logging failures. Never aborts early.
///
/// Returns the number of services that failed to stop.
pub async fn stop_all(lifecycle: &dyn Lifecycle, services: &[ServiceIdentity]) -> usize {
    let mut failures = 0;
    for identity in services {
        tracing::info!(
            service = identity.name(),
            directory = %identity.directory().display(),
            "stopping service"
        );
        if let Err(e) = lifecycle.stop(identity).await {
            failures += 1;
            tracing::warn!(
                service = identity.name(),
                directory = %identity.directory().display(),
                error = %e,
                "failed to stop service"
            );
        }
    }
    failures
}
