//! Error types for svcbench-core.
//!
//! Only conditions that end a whole run live here. Per-service and per-trial
//! problems are logged by the orchestrator and recorded in the run summary.

/// Fatal harness errors.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The discovery registry did not answer the leader probe.
    #[error("discovery registry unreachable at {url}")]
    RegistryUnreachable {
        /// Leader endpoint that was probed.
        url: String,
    },

    /// The services root could not be enumerated.
    #[error("service resolution failed: {0}")]
    Resolve(#[from] crate::resolver::ResolveError),

    /// An HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Per-service measurement failure. The service is skipped for the trial.
#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    /// A lifecycle command failed.
    #[error(transparent)]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    /// The service did not become ready in time.
    #[error(
        "{service} not ready after {waited_secs:.1}s (discovery={discovery_ready}, health={health_ready})"
    )]
    NotReady {
        /// Service name.
        service: String,
        /// How long the readiness cycle waited.
        waited_secs: f64,
        /// Whether the registry signal passed.
        discovery_ready: bool,
        /// Whether the health signal passed.
        health_ready: bool,
    },
}
