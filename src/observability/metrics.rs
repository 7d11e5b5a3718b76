//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resilience metrics (breaker state, call outcomes, probe latency)
//! - Expose a Prometheus-compatible scrape endpoint
//! - Track per-service metrics
//!
//! # Metrics
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `circuit_breaker_calls_total` (counter): calls by service, outcome
//! - `health_probe_duration_seconds` (histogram): probe latency per service
//! - `service_health_percentage` (gauge): healthy replicas out of 100
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are the configured service key, never the endpoint URL

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::resilience::state::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_circuit_state(service: &str, state: CircuitState) {
    gauge!("circuit_breaker_state", "service" => service.to_string()).set(state.as_gauge());
}

/// `outcome` is one of `success`, `failure`, `rejected`.
pub fn record_breaker_call(service: &str, outcome: &'static str) {
    counter!(
        "circuit_breaker_calls_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_probe(service: &str, elapsed: Duration) {
    histogram!("health_probe_duration_seconds", "service" => service.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_service_health(service: &str, percentage: f64) {
    gauge!("service_health_percentage", "service" => service.to_string()).set(percentage);
}
