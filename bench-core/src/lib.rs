//! # svcbench-core
//!
//! Benchmark and health-verification harness for services registered with a
//! discovery registry and run under a container orchestration tool.
//!
//! ## Features
//!
//! - **Dual-signal readiness**: a service counts as ready once the registry
//!   reports its checks passing *and* its own health endpoint answers 200
//! - **Failure recovery**: time from a forced recreate until both signals pass
//! - **Startup**: time from a start command until both signals pass
//! - **Load**: concurrent probe batches at configurable stress levels
//! - **Reports**: one CSV file per trial, interrupt-safe teardown
//!
//! ## Example
//!
//! ```ignore
//! use svcbench_core::{HarnessConfig, MetricFamily, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = HarnessConfig::from_file("svc-bench.toml".as_ref())?;
//! let orchestrator = Orchestrator::with_compose(config)?;
//! let summary = orchestrator
//!     .run(MetricFamily::Startup, &CancellationToken::new())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load;
pub mod orchestrator;
pub mod readiness;
pub mod report;
pub mod resolver;
pub mod shutdown;

pub use config::{ConfigError, HarnessConfig};
pub use discovery::{CheckVerdict, DiscoveryClient};
pub use error::{HarnessError, MeasurementError};
pub use health::HealthProbe;
pub use lifecycle::{
    stop_all, ComposeLifecycle, Lifecycle, LifecycleAction, LifecycleCall, LifecycleError,
    MockLifecycle,
};
pub use load::{summarize, Endpoint, EndpointSummary, LoadGenerator};
pub use orchestrator::{Orchestrator, RunSummary, TrialOutcome};
pub use readiness::{ReadinessMonitor, ReadinessSignal};
pub use report::{read_report, ParsedReport, ReportError, ReportRow, ReportWriter};
pub use resolver::{resolve, ResolveError};
pub use shutdown::install_signal_handler;
pub use svcbench_types::{
    LoadResult, MetricFamily, ReadinessOutcome, ReadinessResult, ServiceIdentity, Trial,
};
