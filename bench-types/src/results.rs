//! Measurement results.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time-to-first-pass of the two readiness signals, relative to the
/// lifecycle operation that started the cycle.
///
/// `None` means the signal never passed during the cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessResult {
    /// When the discovery registry first reported every check passing.
    pub discovery_ready_at: Option<Duration>,
    /// When the health endpoint first answered 200.
    pub health_ready_at: Option<Duration>,
}

impl ReadinessResult {
    /// Discovery registry has converged.
    pub fn discovery_ready(&self) -> bool {
        self.discovery_ready_at.is_some()
    }

    /// Application health endpoint is serving.
    pub fn health_ready(&self) -> bool {
        self.health_ready_at.is_some()
    }

    /// Both signals have passed.
    pub fn both_ready(&self) -> bool {
        self.discovery_ready() && self.health_ready()
    }
}

/// Terminal state of a readiness cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// Both signals passed.
    Ready {
        /// Time-to-first-pass of the discovery signal.
        discovery_ready_at: Duration,
        /// Time-to-first-pass of the health signal.
        health_ready_at: Duration,
        /// Time at which the cycle observed both signals passing.
        total: Duration,
    },
    /// The cycle ran out of time before both signals passed.
    TimedOut {
        /// Signals that did pass before the deadline.
        partial: ReadinessResult,
        /// How long the cycle waited.
        waited: Duration,
    },
}

impl ReadinessOutcome {
    /// Returns true for [`ReadinessOutcome::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessOutcome::Ready { .. })
    }

    /// Per-signal timings, complete or partial.
    pub fn result(&self) -> ReadinessResult {
        match *self {
            ReadinessOutcome::Ready {
                discovery_ready_at,
                health_ready_at,
                ..
            } => ReadinessResult {
                discovery_ready_at: Some(discovery_ready_at),
                health_ready_at: Some(health_ready_at),
            },
            ReadinessOutcome::TimedOut { partial, .. } => partial,
        }
    }
}

/// One probe issued by the load generator.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// Endpoint name the probe was sent to.
    pub service_name: String,
    /// Wall-clock time the probe was issued.
    pub issued_at: DateTime<Utc>,
    /// Time until the probe completed, failed or timed out.
    pub latency: Duration,
    /// True iff the endpoint answered 200.
    pub success: bool,
    /// HTTP status, if a response arrived.
    pub status: Option<u16>,
    /// Stress level active when the probe was issued.
    pub concurrency_group: usize,
}

impl LoadResult {
    /// Latency in fractional milliseconds.
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

/// One repetition of the measurement procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    /// 1-based trial index.
    pub index: u32,
    /// When the trial began.
    pub started_at: DateTime<Utc>,
}

impl Trial {
    /// Start a trial now.
    pub fn begin(index: u32) -> Self {
        Self {
            index,
            started_at: Utc::now(),
        }
    }
}
