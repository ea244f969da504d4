//! Concurrent load generator.
//!
//! A batch at stress level N over M endpoints issues N×M GET requests at
//! once, one spawned task per request, each with its own client and timeout.
//! The batch returns only when every request has finished, and always yields
//! exactly N×M results: errors, timeouts and even panicked tasks are recorded
//! as `success = false` against their endpoint.

use chrono::Utc;
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use svcbench_types::LoadResult;

/// A named URL to put under load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Name written to the report.
    pub name: String,
    /// URL to GET.
    pub url: String,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Issues concurrent probe batches.
#[derive(Debug, Clone, Copy)]
pub struct LoadGenerator {
    request_timeout: Duration,
}

impl LoadGenerator {
    /// Create a generator whose requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Run one batch: `concurrency` simultaneous requests per endpoint.
    ///
    /// Result order is unspecified.
    pub async fn run(&self, endpoints: &[Endpoint], concurrency: usize) -> Vec<LoadResult> {
        tracing::info!(
            endpoints = endpoints.len(),
            concurrency,
            in_flight = endpoints.len() * concurrency,
            "starting load batch"
        );

        let mut pending = Vec::with_capacity(endpoints.len() * concurrency);
        for endpoint in endpoints {
            for _ in 0..concurrency {
                let target = endpoint.clone();
                let timeout = self.request_timeout;
                let issued_at = Utc::now();
                let started = Instant::now();
                let handle =
                    tokio::spawn(async move { probe(target, timeout, concurrency).await });
                pending.push((endpoint.name.clone(), issued_at, started, handle));
            }
        }

        let handles = pending.iter_mut().map(|(_, _, _, handle)| handle);
        let joined = join_all(handles).await;

        pending
            .into_iter()
            .zip(joined)
            .map(|((name, issued_at, started, _), joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        service = %name,
                        error = %e,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "load task did not complete"
                    );
                    LoadResult {
                        service_name: name,
                        issued_at,
                        latency: started.elapsed(),
                        success: false,
                        status: None,
                        concurrency_group: concurrency,
                    }
                }
            })
            .collect()
    }
}

/// Issue one GET with a fresh bounded-timeout client.
async fn probe(endpoint: Endpoint, timeout: Duration, concurrency_group: usize) -> LoadResult {
    let issued_at = Utc::now();
    let started = Instant::now();

    let (success, status) = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => match client.get(&endpoint.url).send().await {
            Ok(response) => {
                let status = response.status();
                // Drain so the latency covers the whole response.
                let drained = response.bytes().await.is_ok();
                if status != reqwest::StatusCode::OK {
                    tracing::debug!(
                        service = %endpoint.name,
                        url = %endpoint.url,
                        status = status.as_u16(),
                        "unexpected status"
                    );
                }
                (drained && status == reqwest::StatusCode::OK, Some(status.as_u16()))
            }
            Err(e) => {
                tracing::debug!(
                    service = %endpoint.name,
                    url = %endpoint.url,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "load request failed"
                );
                (false, None)
            }
        },
        Err(e) => {
            tracing::warn!(
                service = %endpoint.name,
                url = %endpoint.url,
                error = %e,
                "building load client failed"
            );
            (false, None)
        }
    };

    LoadResult {
        service_name: endpoint.name,
        issued_at,
        latency: started.elapsed(),
        success,
        status,
        concurrency_group,
    }
}

/// Per-endpoint statistics for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSummary {
    /// Endpoint name.
    pub service_name: String,
    /// Requests issued.
    pub requests: usize,
    /// Requests answered with 200.
    pub successes: usize,
    /// Fastest request, ms.
    pub min_ms: f64,
    /// Mean latency, ms.
    pub mean_ms: f64,
    /// Median latency, ms.
    pub p50_ms: f64,
    /// 95th percentile latency, ms.
    pub p95_ms: f64,
    /// Slowest request, ms.
    pub max_ms: f64,
}

impl EndpointSummary {
    /// Fraction of requests that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successes as f64 / self.requests as f64
        }
    }
}

/// Summarize a batch per endpoint, sorted by endpoint name.
///
/// Independent of the order results arrived in.
pub fn summarize(results: &[LoadResult]) -> Vec<EndpointSummary> {
    let mut by_service: BTreeMap<&str, Vec<&LoadResult>> = BTreeMap::new();
    for result in results {
        by_service
            .entry(result.service_name.as_str())
            .or_default()
            .push(result);
    }

    by_service
        .into_iter()
        .map(|(name, results)| {
            let mut latencies: Vec<f64> = results.iter().map(|r| r.latency_ms()).collect();
            latencies.sort_by(f64::total_cmp);
            let requests = latencies.len();
            let mean_ms = latencies.iter().sum::<f64>() / requests as f64;

            EndpointSummary {
                service_name: name.to_string(),
                requests,
                successes: results.iter().filter(|r| r.success).count(),
                min_ms: latencies[0],
                mean_ms,
                p50_ms: percentile(&latencies, 50),
                p95_ms: percentile(&latencies, 95),
                max_ms: latencies[requests - 1],
            }
        })
        .collect()
}

/// Nearest-rank percentile of a sorted, non-empty slice.
fn percentile(sorted: &[f64], pct: usize) -> f64 {
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted[rank - 1]
}
