//! Single-endpoint health probing.
//!
//! # Responsibilities
//! - GET one replica's health URL with a deadline
//! - Classify the answer into an `EndpointProbeResult`
//!
//! # Classification
//! ```text
//! status < 400        → healthy
//! 400 <= status < 500 → reachable, unhealthy, no error recorded
//! status >= 500       → unhealthy, error recorded
//! transport / timeout → status 0, response time 0, error recorded
//! ```
//!
//! Probing never fails; errors are data in the result.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::resilience::clock::epoch_ms;

const USER_AGENT: &str = "resilience-health-check";

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointProbeResult {
    pub endpoint: String,
    /// HTTP status, 0 when no response arrived.
    pub status: u16,
    pub healthy: bool,
    /// Milliseconds until the response headers arrived.
    pub response_time: u64,
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub error: Option<String>,
}

impl EndpointProbeResult {
    /// Result for an endpoint that could not be reached.
    pub fn unreachable(endpoint: &str, error: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: 0,
            healthy: false,
            response_time: 0,
            timestamp: epoch_ms(),
            error: Some(error),
        }
    }

    /// Result for an endpoint that answered with `status`.
    pub fn from_status(endpoint: &str, status: u16, response_time: u64) -> Self {
        let error = (status >= 500).then(|| format!("Request failed with status code {}", status));
        Self {
            endpoint: endpoint.to_string(),
            status,
            healthy: status < 400,
            response_time,
            timestamp: epoch_ms(),
            error,
        }
    }
}

/// HTTP client shared by all probes.
#[derive(Debug, Clone, Default)]
pub struct HealthProber {
    client: reqwest::Client,
}

impl HealthProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn probe(&self, endpoint: &str, timeout: Duration) -> EndpointProbeResult {
        let start = Instant::now();
        let response = self
            .client
            .get(endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(timeout)
            .send()
            .await;

        match response {
            Ok(response) => {
                let elapsed = start.elapsed().as_millis() as u64;
                let status = response.status().as_u16();
                if status >= 400 {
                    tracing::warn!(endpoint = %endpoint, status = status, "Health probe returned error status");
                }
                EndpointProbeResult::from_status(endpoint, status, elapsed)
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("timeout of {}ms exceeded", timeout.as_millis())
                } else {
                    e.to_string()
                };
                tracing::warn!(endpoint = %endpoint, error = %message, "Health probe failed");
                EndpointProbeResult::unreachable(endpoint, message)
            }
        }
    }
}
