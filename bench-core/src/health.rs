//! Application health probe.

use crate::readiness::ReadinessSignal;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use svcbench_types::ServiceIdentity;
use tracing::Instrument;

/// Longest body excerpt written to the debug log.
const BODY_LOG_LIMIT: usize = 200;

/// Bounded-timeout GET against a service's health endpoint.
///
/// Healthy iff the status is exactly 200. The timeout should be shorter than
/// the readiness polling tick so one probe never spans two ticks.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    http: reqwest::Client,
    timeout: Duration,
}

impl HealthProbe {
    /// Create a probe with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url`. Connection errors, timeouts and non-200 statuses are `false`.
    ///
    /// The response body is always read to completion.
    pub async fn is_healthy(&self, url: &str) -> bool {
        let started = Instant::now();

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    url,
                    error = %e,
                    timeout = e.is_timeout(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "health probe failed"
                );
                return false;
            }
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => {
                let excerpt = String::from_utf8_lossy(&body[..body.len().min(BODY_LOG_LIMIT)]);
                tracing::debug!(url, status = status.as_u16(), body = %excerpt, "health probe response");
            }
            Err(e) => {
                tracing::debug!(
                    url,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "reading health response body failed"
                );
                return false;
            }
        }

        status == reqwest::StatusCode::OK
    }
}

#[async_trait]
impl ReadinessSignal for HealthProbe {
    fn label(&self) -> &'static str {
        "health"
    }

    async fn check(&self, identity: &ServiceIdentity) -> bool {
        let span = tracing::debug_span!("health_probe", service = identity.name());
        self.is_healthy(identity.health_url()).instrument(span).await
    }
}
