//! Circuit state persistence subsystem.
//!
//! # Data Flow
//! ```text
//! CircuitBreaker::initialize
//!     → StateStore::load (one hash per dependency; absent → defaults)
//!
//! CircuitBreaker transition
//!     → StateStore::compare_and_swap(expected_version, new record)
//!         Applied      → in-memory record replaced
//!         Conflict(r)  → another process wrote first; adopt r, re-apply
//!         Err          → logged, in-memory record used (fail-open)
//! ```
//!
//! # Design Decisions
//! - Writes are conditional on the record version, so two processes
//!   sharing one dependency cannot clobber each other's counters
//! - The decision logic stays in Rust; stores only compare and write
//! - memory.rs backs single-process deployments and tests

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};
use crate::resilience::state::CircuitBreakerRecord;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Errors raised by a state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or command failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored record could not be decoded.
    #[error("corrupt record at {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Backend reachable but refused or answered unexpectedly.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The record was written.
    Applied,
    /// The stored version did not match; carries the current record
    /// (defaults if the key vanished).
    Conflict(CircuitBreakerRecord),
}

/// Shared storage for circuit breaker records.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the record for `service`, `None` if never written.
    async fn load(&self, service: &str) -> Result<Option<CircuitBreakerRecord>, StoreError>;

    /// Write `record` only if the stored version equals `expected_version`
    /// (an absent record has version 0).
    async fn compare_and_swap(
        &self,
        service: &str,
        expected_version: u64,
        record: &CircuitBreakerRecord,
    ) -> Result<CasOutcome, StoreError>;

    /// Liveness check against the backend.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs and status output.
    fn backend(&self) -> &'static str;
}

/// Build the configured store.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn StateStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory circuit state; state is not shared and is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url, &config.key_prefix).await?;
            store.ping().await?;
            tracing::info!(prefix = %config.key_prefix, "Connected to redis state store");
            Ok(Arc::new(store))
        }
    }
}
