//! HTTP middleware.

pub mod catch_panic;
pub mod circuit_breaker;

pub use catch_panic::catch_panic_middleware;
pub use circuit_breaker::{circuit_breaker_middleware, protect};
