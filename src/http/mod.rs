//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, common layers)
//!     → request.rs (request ID assigned or propagated)
//!     → circuit_breaker_api.rs | health_api.rs | gated gateway route
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client (x-request-id echoed)
//! ```

pub mod circuit_breaker_api;
pub mod health_api;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorResponse};
pub use server::HttpServer;
