//! Discovery registry client.
//!
//! Talks to a Consul-compatible HTTP API:
//! - `GET /v1/status/leader` as a pre-flight liveness check
//! - `GET /v1/health/checks/<key>` for per-service check status
//!
//! Every query collapses to a boolean. Failures are logged, never returned.

use crate::readiness::ReadinessSignal;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use svcbench_types::ServiceIdentity;

/// Status string the registry uses for a healthy check.
const PASSING: &str = "passing";

/// One entry of the registry's health-check list. Other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheck {
    /// Check status (`passing`, `warning`, `critical`).
    #[serde(rename = "Status")]
    pub status: String,
}

/// Why a health-check payload does not count as healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckVerdict {
    /// Every check is passing.
    Passing,
    /// The registry returned an empty list.
    NoChecks,
    /// At least one check has a different status.
    NotPassing(String),
    /// The payload is not a list of objects with a string `Status`.
    Malformed(String),
}

/// Evaluate a raw health-check payload.
///
/// Healthy only if the list is non-empty and every `Status` is exactly `passing`.
pub fn evaluate_checks(body: &[u8]) -> CheckVerdict {
    let checks: Vec<HealthCheck> = match serde_json::from_slice(body) {
        Ok(checks) => checks,
        Err(e) => return CheckVerdict::Malformed(e.to_string()),
    };

    if checks.is_empty() {
        return CheckVerdict::NoChecks;
    }

    match checks.iter().find(|check| check.status != PASSING) {
        Some(check) => CheckVerdict::NotPassing(check.status.clone()),
        None => CheckVerdict::Passing,
    }
}

/// Client for the discovery registry HTTP API.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    base_url: String,
    http: reqwest::Client,
}

impl DiscoveryClient {
    /// Create a client with the given per-request timeout.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the leader status URL.
    pub fn leader_url(&self) -> String {
        format!("{}/v1/status/leader", self.base_url)
    }

    /// Build the health-check URL for a registry key.
    pub fn checks_url(&self, key: &str) -> String {
        format!("{}/v1/health/checks/{}", self.base_url, key)
    }

    /// Pre-flight check: does the registry answer 200 on its leader endpoint.
    ///
    /// Only reachability is checked; the leader address in the body is not
    /// interpreted.
    pub async fn leader_reachable(&self) -> bool {
        let url = self.leader_url();
        match self.http.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                // Release the connection before returning.
                let _ = response.bytes().await;
                if status == reqwest::StatusCode::OK {
                    tracing::debug!(url = %url, "leader answered");
                    true
                } else {
                    tracing::error!(url = %url, status = status.as_u16(), "discovery registry answered non-200");
                    false
                }
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "discovery registry unreachable");
                false
            }
        }
    }

    /// Is every registered check for `key` passing.
    ///
    /// Network errors, non-200 responses, empty lists and malformed payloads
    /// all yield `false`.
    pub async fn is_service_healthy(&self, key: &str) -> bool {
        let url = self.checks_url(key);
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    service = key,
                    url = %url,
                    error = %e,
                    elapsed_ms = elapsed_ms(),
                    "registry query failed"
                );
                return false;
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    service = key,
                    url = %url,
                    error = %e,
                    elapsed_ms = elapsed_ms(),
                    "reading registry response failed"
                );
                return false;
            }
        };

        if status != reqwest::StatusCode::OK {
            tracing::warn!(
                service = key,
                url = %url,
                status = status.as_u16(),
                elapsed_ms = elapsed_ms(),
                "unexpected registry status"
            );
            return false;
        }

        match evaluate_checks(&body) {
            CheckVerdict::Passing => {
                tracing::debug!(service = key, "all registry checks passing");
                true
            }
            CheckVerdict::NoChecks => {
                tracing::debug!(service = key, url = %url, "no registry checks yet");
                false
            }
            CheckVerdict::NotPassing(check_status) => {
                tracing::debug!(service = key, status = %check_status, "registry check not passing");
                false
            }
            CheckVerdict::Malformed(reason) => {
                tracing::warn!(
                    service = key,
                    url = %url,
                    reason = %reason,
                    elapsed_ms = elapsed_ms(),
                    "malformed registry payload"
                );
                false
            }
        }
    }
}

#[async_trait]
impl ReadinessSignal for DiscoveryClient {
    fn label(&self) -> &'static str {
        "discovery"
    }

    async fn check(&self, identity: &ServiceIdentity) -> bool {
        self.is_service_healthy(identity.discovery_key()).await
    }
}
