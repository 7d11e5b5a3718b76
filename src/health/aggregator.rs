//! Health aggregation across services and replicas.
//!
//! # Responsibilities
//! - Probe every replica of a service and roll the results up
//! - Roll services up into a system-wide verdict
//! - Keep the latest result per service in the TTL cache
//!
//! # Rollup Rules
//! - A service is up when at least one replica is healthy
//! - `healthPercentage = 100 * healthy / total` (0 with no replicas)
//! - The system is healthy when every critical service is up
//! - Average latency counts healthy probes only

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::ServiceEndpointConfig;
use crate::health::cache::HealthCache;
use crate::health::prober::{EndpointProbeResult, HealthProber};
use crate::observability::metrics;
use crate::resilience::clock::epoch_ms;

/// Rolled-up health of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthResult {
    /// Configuration key, e.g. `market_data_service`.
    pub service: String,
    /// Display name.
    pub name: String,
    pub overall_health: bool,
    pub health_percentage: f64,
    pub healthy_instances: usize,
    pub total_instances: usize,
    pub critical: bool,
    pub endpoints: Vec<EndpointProbeResult>,
    /// Epoch milliseconds.
    pub last_checked: u64,
}

impl ServiceHealthResult {
    pub fn from_probes(config: &ServiceEndpointConfig, endpoints: Vec<EndpointProbeResult>, now: u64) -> Self {
        let total_instances = endpoints.len();
        let healthy_instances = endpoints.iter().filter(|e| e.healthy).count();
        let health_percentage = if total_instances == 0 {
            0.0
        } else {
            healthy_instances as f64 / total_instances as f64 * 100.0
        };

        Self {
            service: config.key.clone(),
            name: config.name.clone(),
            overall_health: healthy_instances > 0,
            health_percentage,
            healthy_instances,
            total_instances,
            critical: config.critical,
            endpoints,
            last_checked: now,
        }
    }

    /// Mean response time of healthy probes, in milliseconds.
    pub fn average_response_time(&self) -> f64 {
        let total: u64 = self
            .endpoints
            .iter()
            .filter(|e| e.healthy)
            .map(|e| e.response_time)
            .sum();
        total as f64 / self.healthy_instances.max(1) as f64
    }
}

/// System-wide counts and verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    pub system_health: bool,
    pub total_services: usize,
    pub healthy_services: usize,
    pub critical_services: usize,
    pub healthy_critical_services: usize,
}

pub fn summarize(results: &[ServiceHealthResult]) -> SystemSummary {
    let critical: Vec<_> = results.iter().filter(|r| r.critical).collect();
    let healthy_critical_services = critical.iter().filter(|r| r.overall_health).count();

    SystemSummary {
        system_health: healthy_critical_services == critical.len(),
        total_services: results.len(),
        healthy_services: results.iter().filter(|r| r.overall_health).count(),
        critical_services: critical.len(),
        healthy_critical_services,
    }
}

/// One service's entry in the detailed report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport {
    #[serde(flatten)]
    pub health: ServiceHealthResult,
    pub average_response_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub summary: SystemSummary,
    pub services: Vec<ServiceReport>,
    pub generated_at: u64,
}

/// Numbers-only view of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub health_percentage: f64,
    pub healthy_instances: usize,
    pub total_instances: usize,
    pub average_response_time: f64,
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub system_health: bool,
    pub services: BTreeMap<String, ServiceMetrics>,
    pub timestamp: u64,
}

/// Probes configured services and caches their rollups.
#[derive(Debug)]
pub struct HealthAggregator {
    services: Vec<ServiceEndpointConfig>,
    prober: HealthProber,
    cache: HealthCache,
}

impl HealthAggregator {
    pub fn new(services: Vec<ServiceEndpointConfig>, cache_ttl: Duration) -> Self {
        Self {
            services,
            prober: HealthProber::new(),
            cache: HealthCache::new(cache_ttl),
        }
    }

    pub fn services(&self) -> &[ServiceEndpointConfig] {
        &self.services
    }

    pub fn service_config(&self, key: &str) -> Option<&ServiceEndpointConfig> {
        self.services.iter().find(|s| s.key == key)
    }

    /// Probe all replicas of one service concurrently.
    pub async fn check_service_health(&self, config: &ServiceEndpointConfig) -> ServiceHealthResult {
        let timeout = Duration::from_millis(config.timeout_ms);
        let probes = config.endpoints.iter().map(|endpoint| async move {
            let start = std::time::Instant::now();
            let result = self.prober.probe(endpoint, timeout).await;
            metrics::record_probe(&config.key, start.elapsed());
            result
        });
        let endpoints = join_all(probes).await;

        let result = ServiceHealthResult::from_probes(config, endpoints, epoch_ms());
        metrics::record_service_health(&config.key, result.health_percentage);

        if !result.overall_health {
            tracing::warn!(
                service = %config.key,
                critical = config.critical,
                total = result.total_instances,
                "Service has no healthy instances"
            );
        } else {
            tracing::debug!(
                service = %config.key,
                healthy = result.healthy_instances,
                total = result.total_instances,
                "Service health checked"
            );
        }
        result
    }

    /// Cached result if still fresh.
    pub fn get_cached_result(&self, key: &str) -> Option<ServiceHealthResult> {
        self.cache.get(key)
    }

    /// Cache-aware check of one service. `None` for unknown keys; the flag
    /// tells whether the result came from the cache.
    pub async fn check_service(&self, key: &str) -> Option<(ServiceHealthResult, bool)> {
        let config = self.service_config(key)?;
        if let Some(cached) = self.cache.get(key) {
            return Some((cached, true));
        }
        let result = self.check_service_health(config).await;
        self.cache.insert(result.clone());
        Some((result, false))
    }

    /// Fresh probe of every service, in configuration order. Refreshes the cache.
    pub async fn check_all_services_health(&self) -> Vec<ServiceHealthResult> {
        let results = join_all(self.services.iter().map(|s| self.check_service_health(s))).await;
        for result in &results {
            self.cache.insert(result.clone());
        }
        results
    }

    pub async fn report(&self) -> HealthReport {
        let results = self.check_all_services_health().await;
        let summary = summarize(&results);
        let services = results
            .into_iter()
            .map(|health| ServiceReport {
                average_response_time: health.average_response_time(),
                health,
            })
            .collect();

        HealthReport {
            summary,
            services,
            generated_at: epoch_ms(),
        }
    }

    pub async fn metrics(&self) -> HealthMetrics {
        let results = self.check_all_services_health().await;
        let system_health = summarize(&results).system_health;
        let services = results
            .iter()
            .map(|r| {
                (
                    r.service.clone(),
                    ServiceMetrics {
                        health_percentage: r.health_percentage,
                        healthy_instances: r.healthy_instances,
                        total_instances: r.total_instances,
                        average_response_time: r.average_response_time(),
                        critical: r.critical,
                    },
                )
            })
            .collect();

        HealthMetrics {
            system_health,
            services,
            timestamp: epoch_ms(),
        }
    }
}
