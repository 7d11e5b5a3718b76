//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a protected dependency:
//!     → registry.rs (look up the breaker by service name)
//!     → circuit_breaker.rs (admit or reject, run operation, record outcome)
//!     → state.rs record persisted through crate::store
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, never a global one
//! - Breakers are dependency-agnostic: any `FnOnce() -> Future<Result>`
//! - Time comes from clock.rs so recovery timeouts are testable

pub mod circuit_breaker;
pub mod clock;
pub mod registry;
pub mod state;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitBreakerStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::CircuitBreakerRegistry;
pub use state::{CircuitBreakerRecord, CircuitState};
