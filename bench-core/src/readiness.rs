//! Dual-signal readiness monitor.
//!
//! A service is usable once two independent signals pass: the discovery
//! registry reports all its checks passing, and its own health endpoint
//! answers 200. Both are polled on the same fixed tick; each records its own
//! time-to-first-pass and is not probed again once it has passed. Either may
//! flip first.
//!
//! The cycle ends in exactly one of two states: both signals ready, or the
//! deadline elapsed. The deadline also cancels a probe that is still in
//! flight, so the wait is bounded by the timeout plus scheduling slack.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use svcbench_types::{ReadinessOutcome, ReadinessResult, ServiceIdentity};
use tokio::time::MissedTickBehavior;

/// One readiness signal for a service.
#[async_trait]
pub trait ReadinessSignal: Send + Sync {
    /// Short name used in logs.
    fn label(&self) -> &'static str;

    /// Probe the signal once. Never errors; failures are `false`.
    async fn check(&self, identity: &ServiceIdentity) -> bool;
}

/// Polls two readiness signals until both pass or the timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessMonitor {
    poll_interval: Duration,
    timeout: Duration,
}

impl ReadinessMonitor {
    /// Create a monitor polling every `poll_interval` for at most `timeout`.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Polling tick.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Deadline for one cycle.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one readiness cycle for `identity`.
    ///
    /// Signal timestamps are measured from `started`, normally the instant the
    /// lifecycle operation was issued. The deadline runs from the call.
    pub async fn wait_until_ready(
        &self,
        identity: &ServiceIdentity,
        started: Instant,
        discovery: &dyn ReadinessSignal,
        health: &dyn ReadinessSignal,
    ) -> ReadinessOutcome {
        let waiting_since = Instant::now();
        let mut result = ReadinessResult::default();

        let polled = tokio::time::timeout(
            self.timeout,
            self.poll(identity, started, discovery, health, &mut result),
        )
        .await;

        match polled {
            Ok(outcome) => {
                if let ReadinessOutcome::Ready { total, .. } = outcome {
                    tracing::info!(
                        service = identity.name(),
                        total_secs = total.as_secs_f64(),
                        "service ready"
                    );
                }
                outcome
            }
            Err(_) => {
                let waited = waiting_since.elapsed();
                tracing::warn!(
                    service = identity.name(),
                    url = identity.health_url(),
                    discovery_ready = result.discovery_ready(),
                    health_ready = result.health_ready(),
                    waited_secs = waited.as_secs_f64(),
                    "service did not become ready before the deadline"
                );
                ReadinessOutcome::TimedOut {
                    partial: result,
                    waited,
                }
            }
        }
    }

    async fn poll(
        &self,
        identity: &ServiceIdentity,
        started: Instant,
        discovery: &dyn ReadinessSignal,
        health: &dyn ReadinessSignal,
        result: &mut ReadinessResult,
    ) -> ReadinessOutcome {
        let first_tick = tokio::time::Instant::now() + self.poll_interval;
        let mut ticker = tokio::time::interval_at(first_tick, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if result.discovery_ready_at.is_none() && discovery.check(identity).await {
                let at = started.elapsed();
                result.discovery_ready_at = Some(at);
                tracing::info!(
                    service = identity.name(),
                    signal = discovery.label(),
                    secs = at.as_secs_f64(),
                    "signal passed"
                );
            }

            if result.health_ready_at.is_none() && health.check(identity).await {
                let at = started.elapsed();
                result.health_ready_at = Some(at);
                tracing::info!(
                    service = identity.name(),
                    signal = health.label(),
                    secs = at.as_secs_f64(),
                    "signal passed"
                );
            }

            if let (Some(discovery_ready_at), Some(health_ready_at)) =
                (result.discovery_ready_at, result.health_ready_at)
            {
                return ReadinessOutcome::Ready {
                    discovery_ready_at,
                    health_ready_at,
                    total: started.elapsed(),
                };
            }

            tracing::debug!(
                service = identity.name(),
                discovery_ready = result.discovery_ready(),
                health_ready = result.health_ready(),
                "waiting for service"
            );
        }
    }
}
