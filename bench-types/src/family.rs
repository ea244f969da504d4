//! Report metric families.

use std::fmt;

/// The kind of measurement a report file holds.
///
/// Each family has a fixed column set and one file per trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    /// Restart a running service and time how long until it is usable again.
    FailureRecovery,
    /// Start a stopped service and time each readiness signal.
    Startup,
    /// Escalating concurrent probes against the health endpoints.
    Load,
}

impl MetricFamily {
    /// All families.
    pub const ALL: [MetricFamily; 3] = [Self::FailureRecovery, Self::Startup, Self::Load];

    /// Stable identifier used in file names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::FailureRecovery => "failure_recovery",
            MetricFamily::Startup => "startup",
            MetricFamily::Load => "load",
        }
    }

    /// Report header for this family.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MetricFamily::FailureRecovery => &["service", "recovery_time_s", "detection_time_s"],
            MetricFamily::Startup => &[
                "service",
                "total_s",
                "discovery_time_s",
                "health_time_s",
                "discovery_passed",
                "container_start_time_s",
            ],
            MetricFamily::Load => &[
                "service",
                "request_time",
                "latency_ms",
                "success",
                "concurrency_group",
            ],
        }
    }

    /// Report file name for a trial, e.g. `startup_trial_3.csv`.
    pub fn file_name(&self, trial_index: u32) -> String {
        format!("{}_trial_{}.csv", self.as_str(), trial_index)
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
