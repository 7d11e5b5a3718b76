//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both
//! resilience services. All types derive Serde traits for deserialization
//! from TOML files, and every section falls back to defaults so a minimal
//! file (or no file at all) yields a working fleet description.

use serde::{Deserialize, Serialize};

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Circuit breaker service listener.
    pub circuit_breaker_service: ServerConfig,

    /// Health check service listener.
    pub health_service: ServerConfig,

    /// Persistence backend for circuit state.
    pub store: StoreConfig,

    /// One entry per protected dependency.
    pub circuit_breakers: Vec<CircuitBreakerConfig>,

    /// Health aggregation settings (cache TTL, scheduler).
    pub health: HealthConfig,

    /// Monitored services and their replica endpoints.
    pub services: Vec<ServiceEndpointConfig>,

    /// Route prefixes gated by a circuit breaker on the circuit breaker service.
    pub gateway_routes: Vec<GatewayRouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_service: ServerConfig::with_address("0.0.0.0:3005"),
            health_service: ServerConfig::with_address("0.0.0.0:3006"),
            store: StoreConfig::default(),
            circuit_breakers: default_circuit_breakers(),
            health: HealthConfig::default(),
            services: default_services(),
            gateway_routes: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3005").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    fn with_address(addr: &str) -> Self {
        Self {
            bind_address: addr.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3005".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Which store implementation backs circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis hash per dependency.
    Redis,
    /// Process-local map; state is lost on restart.
    Memory,
}

/// State store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Connection URL, including password if any
    /// (e.g., "redis://:secret@127.0.0.1:6379/0").
    pub redis_url: String,

    /// Records live at `<key_prefix>:<service>`.
    pub key_prefix: String,

    /// How many times a conflicting write is re-applied on fresh state.
    pub cas_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "circuit_breaker".to_string(),
            cas_retries: 3,
        }
    }
}

/// Thresholds for one protected dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CircuitBreakerConfig {
    /// Dependency name; also the store key suffix.
    pub name: String,

    /// Failures inside the monitoring period before the circuit opens.
    pub failure_threshold: u32,

    /// Time to stay OPEN before a trial call is allowed, in milliseconds.
    pub recovery_timeout_ms: u64,

    /// Window after which an isolated failure stops counting, in milliseconds.
    pub monitoring_period_ms: u64,

    /// Concurrent trial calls allowed while HALF_OPEN.
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    pub fn new(
        name: &str,
        failure_threshold: u32,
        recovery_timeout_ms: u64,
        monitoring_period_ms: u64,
        half_open_max_calls: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            failure_threshold,
            recovery_timeout_ms,
            monitoring_period_ms,
            half_open_max_calls,
        }
    }
}

fn default_circuit_breakers() -> Vec<CircuitBreakerConfig> {
    vec![
        CircuitBreakerConfig::new("user_service", 5, 30_000, 60_000, 3),
        CircuitBreakerConfig::new("trading_service", 3, 60_000, 30_000, 2),
        CircuitBreakerConfig::new("portfolio_service", 5, 30_000, 60_000, 3),
        CircuitBreakerConfig::new("market_data_service", 10, 15_000, 30_000, 5),
        CircuitBreakerConfig::new("cache_service", 5, 10_000, 30_000, 3),
    ]
}

/// Health aggregation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// How long a single-service result may be served from cache.
    pub cache_ttl_ms: u64,

    /// Background refresh interval in seconds (0 disables the scheduler).
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
            interval_secs: 30,
        }
    }
}

/// A monitored service and its replicas.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceEndpointConfig {
    /// Service key used in routes (e.g., "market_data_service").
    pub key: String,

    /// Display name.
    pub name: String,

    /// Replica health URLs, probed in this order.
    pub endpoints: Vec<String>,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,

    /// Critical services decide system health.
    #[serde(default)]
    pub critical: bool,
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn service(key: &str, name: &str, endpoints: &[&str], critical: bool) -> ServiceEndpointConfig {
    ServiceEndpointConfig {
        key: key.to_string(),
        name: name.to_string(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        timeout_ms: default_probe_timeout_ms(),
        critical,
    }
}

fn default_services() -> Vec<ServiceEndpointConfig> {
    vec![
        service(
            "user_service",
            "User Service",
            &[
                "http://user-service-1:3001/health",
                "http://user-service-2:3001/health",
            ],
            true,
        ),
        service(
            "trading_service",
            "Trading Service",
            &[
                "http://trading-service-1:3002/health",
                "http://trading-service-2:3002/health",
            ],
            true,
        ),
        service(
            "portfolio_service",
            "Portfolio Service",
            &[
                "http://portfolio-service-1:3003/health",
                "http://portfolio-service-2:3003/health",
            ],
            true,
        ),
        service(
            "market_data_service",
            "Market Data Service",
            &[
                "http://market-data-service-1:3004/health",
                "http://market-data-service-2:3004/health",
                "http://market-data-service-3:3004/health",
                "http://market-data-service-4:3004/health",
            ],
            true,
        ),
        service(
            "cache_service",
            "Cache Service",
            &["http://cache-service-1:6380/health"],
            false,
        ),
    ]
}

/// A route prefix answered only while the named breaker admits calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatewayRouteConfig {
    /// Prefix such as "/api/trading"; must start with '/' and not end with one.
    pub path_prefix: String,

    /// Circuit breaker guarding the prefix.
    pub service: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
