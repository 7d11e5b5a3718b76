//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! On demand (HTTP) or periodic timer (monitor.rs):
//!     → aggregator.rs: for each service, all replicas concurrently
//!         → prober.rs: GET with timeout → EndpointProbeResult
//!     → Roll up per service, then system-wide
//!     → cache.rs (latest result per service, TTL)
//! ```
//!
//! # Design Decisions
//! - At-least-one policy: a service is up if any replica is healthy
//! - Only critical services decide system health
//! - Single-service checks read the cache; aggregate views always probe

pub mod aggregator;
pub mod cache;
pub mod monitor;
pub mod prober;

pub use aggregator::{HealthAggregator, ServiceHealthResult, SystemSummary};
pub use monitor::HealthMonitor;
pub use prober::{EndpointProbeResult, HealthProber};
