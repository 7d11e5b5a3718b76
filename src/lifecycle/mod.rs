//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → both HTTP servers stop accepting and drain
//!             → health monitor loop exits
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - Servers finish in-flight requests before returning

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
