//! Resilience layer: circuit breaker and health check services.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;

pub use config::schema::ResilienceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{CircuitBreaker, CircuitBreakerRegistry};
