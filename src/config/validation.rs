//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (gateway routes reference registered breakers)
//! - Validate value ranges (thresholds ≥ 1, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{ResilienceConfig, ServerConfig};

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{section}: invalid bind address '{address}'")]
    BindAddress { section: &'static str, address: String },

    #[error("{section}: request_timeout_secs must be greater than 0")]
    RequestTimeout { section: &'static str },

    #[error("circuit breaker at index {0} has an empty name")]
    EmptyBreakerName(usize),

    #[error("duplicate circuit breaker '{0}'")]
    DuplicateBreaker(String),

    #[error("circuit breaker '{name}': {field} must be at least 1")]
    BreakerThreshold { name: String, field: &'static str },

    #[error("duplicate service '{0}'")]
    DuplicateService(String),

    #[error("service '{0}' has no endpoints")]
    NoEndpoints(String),

    #[error("service '{service}': invalid endpoint '{endpoint}'")]
    InvalidEndpoint { service: String, endpoint: String },

    #[error("service '{0}': timeout_ms must be greater than 0")]
    ProbeTimeout(String),

    #[error("gateway route '{0}' must start with '/' and not end with '/'")]
    RoutePrefix(String),

    #[error("gateway route '{0}' collides with a built-in endpoint")]
    ReservedPrefix(String),

    #[error("duplicate gateway route '{0}'")]
    DuplicateRoute(String),

    #[error("gateway route '{prefix}' references unknown circuit breaker '{service}'")]
    UnknownBreaker { prefix: String, service: String },

    #[error("store: cas_retries must be at most 16")]
    CasRetries,

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// First path segments owned by the circuit breaker service's own routes.
const RESERVED_SEGMENTS: [&str; 4] = ["health", "status", "reset", "test"];

/// Validate a parsed configuration.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_server("circuit_breaker_service", &config.circuit_breaker_service, &mut errors);
    validate_server("health_service", &config.health_service, &mut errors);

    if config.store.cas_retries > 16 {
        errors.push(ValidationError::CasRetries);
    }

    let mut breakers = HashSet::new();
    for (i, cb) in config.circuit_breakers.iter().enumerate() {
        if cb.name.trim().is_empty() {
            errors.push(ValidationError::EmptyBreakerName(i));
            continue;
        }
        if !breakers.insert(cb.name.as_str()) {
            errors.push(ValidationError::DuplicateBreaker(cb.name.clone()));
        }
        let checks = [
            ("failure_threshold", cb.failure_threshold as u64),
            ("half_open_max_calls", cb.half_open_max_calls as u64),
            ("recovery_timeout_ms", cb.recovery_timeout_ms),
            ("monitoring_period_ms", cb.monitoring_period_ms),
        ];
        for (field, value) in checks {
            if value == 0 {
                errors.push(ValidationError::BreakerThreshold {
                    name: cb.name.clone(),
                    field,
                });
            }
        }
    }

    let mut services = HashSet::new();
    for svc in &config.services {
        if !services.insert(svc.key.as_str()) {
            errors.push(ValidationError::DuplicateService(svc.key.clone()));
        }
        if svc.endpoints.is_empty() {
            errors.push(ValidationError::NoEndpoints(svc.key.clone()));
        }
        for endpoint in &svc.endpoints {
            let valid = Url::parse(endpoint)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::InvalidEndpoint {
                    service: svc.key.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        if svc.timeout_ms == 0 {
            errors.push(ValidationError::ProbeTimeout(svc.key.clone()));
        }
    }

    let mut prefixes = HashSet::new();
    for route in &config.gateway_routes {
        let prefix = &route.path_prefix;
        if !prefix.starts_with('/')
            || prefix.len() < 2
            || prefix.ends_with('/')
            || prefix.contains("//")
            || prefix.contains(['{', '}', '*'])
        {
            errors.push(ValidationError::RoutePrefix(prefix.clone()));
        }
        let first_segment = prefix.trim_start_matches('/').split('/').next().unwrap_or_default();
        if RESERVED_SEGMENTS.contains(&first_segment) {
            errors.push(ValidationError::ReservedPrefix(prefix.clone()));
        }
        if !prefixes.insert(prefix.as_str()) {
            errors.push(ValidationError::DuplicateRoute(prefix.clone()));
        }
        if !breakers.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownBreaker {
                prefix: prefix.clone(),
                service: route.service.clone(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(section: &'static str, server: &ServerConfig, errors: &mut Vec<ValidationError>) {
    if server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress {
            section,
            address: server.bind_address.clone(),
        });
    }
    if server.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout { section });
    }
}
