//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! --config <file> | $RESILIENCE_CONFIG | built-in defaults
//!     → loader.rs (parse & deserialize TOML)
//!     → validation.rs (semantic checks)
//!     → ResilienceConfig (validated, immutable)
//!     → passed by value/Arc into the registry, aggregator and servers
//! ```
//!
//! # Design Decisions
//! - No module-level service tables; everything is injected at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, GatewayRouteConfig, HealthConfig, LogFormat, ObservabilityConfig,
    ResilienceConfig, ServerConfig, ServiceEndpointConfig, StoreBackend, StoreConfig,
};
