//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: a bounded number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_threshold failures within the last monitoring period
//! Open → Half-Open: after recovery timeout (checked on the next call)
//! Half-Open → Closed: a trial call succeeds
//! Half-Open → Open: a trial call fails
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global)
//! - Fail fast in Open state; the wrapped operation is never invoked
//! - The operation's own error is always handed back to the caller
//! - Admission re-reads the shared record first, so a circuit opened by
//!   another process is honored here before the operation runs
//! - Every transition is persisted with a versioned compare-and-swap;
//!   store outages are logged and the in-memory record keeps deciding

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::clock::Clock;
use crate::resilience::state::{CircuitBreakerRecord, CircuitState};
use crate::store::{CasOutcome, StateStore, StoreError};

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open and the recovery timeout has not elapsed.
    #[error("Circuit breaker is OPEN for service {service}")]
    CircuitOpen { service: String },

    /// The half-open trial budget is used up.
    #[error("Circuit breaker is HALF_OPEN for service {service} and the trial call limit is reached")]
    HalfOpenLimit { service: String },

    /// The wrapped operation failed.
    #[error("{0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// True when the breaker refused the call without running it.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, BreakerError::Operation(_))
    }
}

/// Read-only snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStats {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: u64,
    pub half_open_calls: u32,
    pub last_updated: u64,
    pub failure_threshold: u32,
    pub recovery_timeout: u64,
    pub monitoring_period: u64,
    pub half_open_max_calls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Open,
    HalfOpenLimit,
}

/// Decide whether a call may proceed, mutating the record for the
/// OPEN → HALF_OPEN transition and the trial-call count.
fn admit(record: &mut CircuitBreakerRecord, config: &CircuitBreakerConfig, now: u64) -> Result<(), Rejection> {
    if record.state == CircuitState::Open {
        if now.saturating_sub(record.last_failure_time) < config.recovery_timeout_ms {
            return Err(Rejection::Open);
        }
        record.state = CircuitState::HalfOpen;
        record.half_open_calls = 0;
        record.last_updated = now;
    }

    if record.state == CircuitState::HalfOpen {
        if record.half_open_calls >= config.half_open_max_calls {
            return Err(Rejection::HalfOpenLimit);
        }
        record.half_open_calls += 1;
        record.last_updated = now;
    }

    Ok(())
}

fn on_success(record: &mut CircuitBreakerRecord, now: u64) {
    if record.state == CircuitState::HalfOpen {
        record.state = CircuitState::Closed;
        record.failure_count = 0;
        record.half_open_calls = 0;
        record.failure_times.clear();
    }
    record.last_updated = now;
}

fn on_failure(record: &mut CircuitBreakerRecord, config: &CircuitBreakerConfig, now: u64) {
    record.last_failure_time = now;
    record.last_updated = now;

    match record.state {
        CircuitState::Closed => {
            // Sliding window: only failures within the last monitoring period count.
            record
                .failure_times
                .retain(|&t| now.saturating_sub(t) < config.monitoring_period_ms);
            record.failure_times.push(now);
            let cap = config.failure_threshold.max(1) as usize;
            if record.failure_times.len() > cap {
                let excess = record.failure_times.len() - cap;
                record.failure_times.drain(..excess);
            }
            record.failure_count = record.failure_times.len() as u32;
            if record.failure_count >= config.failure_threshold {
                record.state = CircuitState::Open;
            }
        }
        CircuitState::HalfOpen => {
            record.failure_count += 1;
            record.state = CircuitState::Open;
        }
        CircuitState::Open => record.failure_count += 1,
    }
}

fn reset_record(record: &mut CircuitBreakerRecord, now: u64) {
    record.state = CircuitState::Closed;
    record.failure_count = 0;
    record.last_failure_time = 0;
    record.half_open_calls = 0;
    record.failure_times.clear();
    record.last_updated = now;
}

/// Guards calls to one named dependency.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    cas_retries: u32,
    record: Mutex<CircuitBreakerRecord>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("store", &self.store.backend())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a breaker, returning only once persisted state has been read.
    ///
    /// A missing record means CLOSED with zero counters. If the store cannot
    /// be read the breaker starts from defaults and logs a warning.
    pub async fn initialize(
        config: CircuitBreakerConfig,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        cas_retries: u32,
    ) -> Self {
        let record = match store.load(&config.name).await {
            Ok(Some(record)) => {
                tracing::info!(
                    service = %config.name,
                    state = %record.state,
                    failure_count = record.failure_count,
                    "Loaded persisted circuit state"
                );
                record
            }
            Ok(None) => CircuitBreakerRecord::default(),
            Err(e) => {
                tracing::warn!(
                    service = %config.name,
                    error = %e,
                    "Failed to load circuit state, starting CLOSED"
                );
                CircuitBreakerRecord::default()
            }
        };

        metrics::record_circuit_state(&config.name, record.state);

        Self {
            name: config.name.clone(),
            config,
            store,
            clock,
            cas_retries,
            record: Mutex::new(record),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `operation` through the breaker.
    ///
    /// Rejected calls never invoke `operation`. Otherwise the outcome is
    /// recorded before the result (or the operation's own error) is returned.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admitted = self
            .commit_fresh(|record, now| admit(record, &self.config, now))
            .await
            .0;

        if let Err(rejection) = admitted {
            metrics::record_breaker_call(&self.name, "rejected");
            tracing::debug!(service = %self.name, rejection = ?rejection, "Call rejected by circuit breaker");
            let service = self.name.clone();
            return Err(match rejection {
                Rejection::Open => BreakerError::CircuitOpen { service },
                Rejection::HalfOpenLimit => BreakerError::HalfOpenLimit { service },
            });
        }

        match operation().await {
            Ok(value) => {
                self.commit(|record, now| on_success(record, now)).await;
                metrics::record_breaker_call(&self.name, "success");
                Ok(value)
            }
            Err(e) => {
                self.commit(|record, now| on_failure(record, &self.config, now)).await;
                metrics::record_breaker_call(&self.name, "failure");
                Err(BreakerError::Operation(e))
            }
        }
    }

    /// Current state, as last written by any process sharing the store.
    pub async fn state(&self) -> CircuitState {
        let mut current = self.record.lock().await;
        self.adopt_newer(&mut current).await;
        current.state
    }

    /// Snapshot of the record plus the static thresholds.
    pub async fn stats(&self) -> CircuitBreakerStats {
        let record = {
            let mut current = self.record.lock().await;
            self.adopt_newer(&mut current).await;
            current.clone()
        };
        CircuitBreakerStats {
            service: self.name.clone(),
            state: record.state,
            failure_count: record.failure_count,
            last_failure_time: record.last_failure_time,
            half_open_calls: record.half_open_calls,
            last_updated: record.last_updated,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout: self.config.recovery_timeout_ms,
            monitoring_period: self.config.monitoring_period_ms,
            half_open_max_calls: self.config.half_open_max_calls,
        }
    }

    /// Administrative reset to CLOSED with zeroed counters.
    ///
    /// The in-memory record is always reset; the error reports whether the
    /// store accepted it.
    pub async fn reset(&self) -> Result<(), StoreError> {
        tracing::info!(service = %self.name, "Resetting circuit breaker");
        match self.commit(reset_record).await.1 {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace `current` with the stored record if another writer has moved
    /// it on. Read failures leave `current` untouched.
    async fn adopt_newer(&self, current: &mut CircuitBreakerRecord) {
        match self.store.load(&self.name).await {
            Ok(Some(stored)) if stored.version > current.version => {
                if stored.state != current.state {
                    tracing::info!(
                        service = %self.name,
                        from = %current.state,
                        to = %stored.state,
                        "Adopted circuit state written by another instance"
                    );
                    metrics::record_circuit_state(&self.name, stored.state);
                }
                *current = stored;
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(
                service = %self.name,
                error = %e,
                "Failed to refresh circuit state, using in-memory state"
            ),
        }
    }

    async fn commit<R>(&self, step: impl FnMut(&mut CircuitBreakerRecord, u64) -> R) -> (R, Option<StoreError>) {
        self.commit_with(false, step).await
    }

    /// Like `commit`, but decides on the latest stored record.
    async fn commit_fresh<R>(&self, step: impl FnMut(&mut CircuitBreakerRecord, u64) -> R) -> (R, Option<StoreError>) {
        self.commit_with(true, step).await
    }

    /// Apply `step` to the record and persist the result.
    ///
    /// The lock is held for the whole decide-and-persist step so one
    /// breaker's transitions are serialized. On a version conflict the
    /// current record is adopted and `step` re-applied to it.
    async fn commit_with<R>(
        &self,
        refresh: bool,
        mut step: impl FnMut(&mut CircuitBreakerRecord, u64) -> R,
    ) -> (R, Option<StoreError>) {
        let mut current = self.record.lock().await;
        if refresh {
            self.adopt_newer(&mut current).await;
        }
        let mut attempts = 0;

        loop {
            let now = self.clock.now_ms();
            let mut next = current.clone();
            let outcome = step(&mut next, now);

            if next == *current {
                return (outcome, None);
            }
            next.version = current.version + 1;

            match self.store.compare_and_swap(&self.name, current.version, &next).await {
                Ok(CasOutcome::Applied) => {
                    self.log_transition(current.state, next.state, &next);
                    *current = next;
                    return (outcome, None);
                }
                Ok(CasOutcome::Conflict(latest)) if attempts < self.cas_retries => {
                    attempts += 1;
                    tracing::debug!(
                        service = %self.name,
                        expected_version = current.version,
                        stored_version = latest.version,
                        attempt = attempts,
                        "Circuit state changed elsewhere, re-applying"
                    );
                    if latest.state != current.state {
                        metrics::record_circuit_state(&self.name, latest.state);
                    }
                    *current = latest;
                }
                Ok(CasOutcome::Conflict(latest)) => {
                    tracing::warn!(
                        service = %self.name,
                        stored_version = latest.version,
                        "Circuit state kept changing under us, keeping local decision unpersisted"
                    );
                    next.version = latest.version;
                    self.log_transition(current.state, next.state, &next);
                    *current = next;
                    return (outcome, None);
                }
                Err(e) => {
                    tracing::warn!(
                        service = %self.name,
                        error = %e,
                        "Failed to persist circuit state, continuing with in-memory state"
                    );
                    next.version = current.version;
                    self.log_transition(current.state, next.state, &next);
                    *current = next;
                    return (outcome, Some(e));
                }
            }
        }
    }

    fn log_transition(&self, from: CircuitState, to: CircuitState, record: &CircuitBreakerRecord) {
        if from == to {
            return;
        }
        match to {
            CircuitState::Open => tracing::warn!(
                service = %self.name,
                from = %from,
                failure_count = record.failure_count,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(
                service = %self.name,
                from = %from,
                to = %to,
                "Circuit breaker state transition"
            ),
        }
        metrics::record_circuit_state(&self.name, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const T0: u64 = 1_700_000_000_000;

    fn config(threshold: u32, recovery_ms: u64, half_open: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new("trading_service", threshold, recovery_ms, 60_000, half_open)
    }

    async fn breaker(
        config: CircuitBreakerConfig,
        store: &MemoryStore,
        clock: &Arc<ManualClock>,
    ) -> CircuitBreaker {
        CircuitBreaker::initialize(config, Arc::new(store.clone()), clock.clone(), 3).await
    }

    async fn fail(cb: &CircuitBreaker) -> BreakerError<String> {
        cb.execute(|| async { Err::<(), _>("boom".to_string()) })
            .await
            .unwrap_err()
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<u32, BreakerError<String>> {
        cb.execute(|| async { Ok::<_, String>(7) }).await
    }

    #[tokio::test]
    async fn test_opens_exactly_at_threshold() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;

        for expected in 1..3 {
            assert!(matches!(fail(&cb).await, BreakerError::Operation(ref e) if e == "boom"));
            assert_eq!(cb.state().await, CircuitState::Closed);
            assert_eq!(cb.stats().await.failure_count, expected);
        }

        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert_eq!(store.get("trading_service").unwrap().state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_rejects_without_invoking() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;
        for _ in 0..3 {
            fail(&cb).await;
        }

        let calls = AtomicU32::new(0);
        clock.advance(10_000);
        let err = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BreakerError::CircuitOpen { ref service } if service == "trading_service"));
        assert!(err.is_rejection());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_recovery_scenario() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;
        for _ in 0..3 {
            fail(&cb).await;
        }

        clock.advance(10_000);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::CircuitOpen { .. })));

        clock.advance(21_000);
        assert_eq!(succeed(&cb).await.unwrap(), 7);

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.half_open_calls, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(2, 5_000, 3), &store, &clock).await;
        fail(&cb).await;
        fail(&cb).await;

        clock.advance(5_000);
        fail(&cb).await;

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Open);
        assert_eq!(stats.last_failure_time, T0 + 5_000);

        // The recovery timeout restarts from the trial failure.
        clock.advance(4_999);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_half_open_limits_concurrent_trials() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = Arc::new(breaker(config(1, 1_000, 1), &store, &clock).await);
        fail(&cb).await;
        clock.advance(1_000);

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.execute(|| async move {
                    let _ = started_tx.send(());
                    let _ = release_rx.await;
                    Ok::<_, String>(1)
                })
                .await
            })
        };

        started_rx.await.unwrap();
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::HalfOpenLimit { .. })));

        release_tx.send(()).unwrap();
        assert_eq!(trial.await.unwrap().unwrap(), 1);
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset_from_any_state() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(1, 60_000, 1), &store, &clock).await;
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        cb.reset().await.unwrap();

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.half_open_calls, 0);
        assert_eq!(stats.last_failure_time, 0);
        let stored = store.get("trading_service").unwrap();
        assert_eq!(stored.state, CircuitState::Closed);
        assert_eq!(stored.last_failure_time, 0);
    }

    #[tokio::test]
    async fn test_failures_within_window_open_on_threshold() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;

        fail(&cb).await;
        clock.advance(25_000);
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        clock.advance(25_000);
        fail(&cb).await;

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Open);
        assert_eq!(stats.failure_count, 3);
    }

    #[tokio::test]
    async fn test_failures_outside_window_do_not_accumulate() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(
            CircuitBreakerConfig::new("market_data_service", 10, 15_000, 30_000, 5),
            &store,
            &clock,
        )
        .await;

        for _ in 0..10 {
            fail(&cb).await;
            clock.advance(29_000);
        }

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 2);
        let stored = store.get("market_data_service").unwrap();
        assert_eq!(stored.failure_times.len(), 2);
    }

    #[tokio::test]
    async fn test_isolated_failures_restart_the_count() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;

        fail(&cb).await;
        fail(&cb).await;
        clock.advance(60_000);
        fail(&cb).await;

        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 1);
    }

    #[tokio::test]
    async fn test_persisted_open_state_is_honored_on_first_call() {
        let store = MemoryStore::new();
        store.insert(
            "trading_service",
            CircuitBreakerRecord {
                state: CircuitState::Open,
                failure_count: 3,
                last_failure_time: T0,
                half_open_calls: 0,
                last_updated: T0,
                version: 4,
                failure_times: vec![T0 - 2, T0 - 1, T0],
            },
        );
        let clock = Arc::new(ManualClock::new(T0 + 1_000));
        let cb = breaker(config(3, 30_000, 1), &store, &clock).await;

        assert!(matches!(succeed(&cb).await, Err(BreakerError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_breakers_sharing_a_store_merge_counts() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let a = breaker(config(3, 30_000, 1), &store, &clock).await;
        let b = breaker(config(3, 30_000, 1), &store, &clock).await;

        fail(&a).await;
        fail(&a).await;
        // b has not seen a write since startup; admission picks up a's failures.
        fail(&b).await;

        assert_eq!(b.state().await, CircuitState::Open);
        let stored = store.get("trading_service").unwrap();
        assert_eq!(stored.failure_count, 3);
        assert_eq!(stored.state, CircuitState::Open);
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn test_circuit_opened_by_peer_fails_fast() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let a = breaker(config(3, 30_000, 1), &store, &clock).await;
        let b = breaker(config(3, 30_000, 1), &store, &clock).await;

        for _ in 0..3 {
            fail(&a).await;
        }
        clock.advance(1_000);

        let calls = AtomicU32::new(0);
        let err = b
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BreakerError::CircuitOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.stats().await.failure_count, 3);
    }

    #[tokio::test]
    async fn test_half_open_budget_is_shared_between_instances() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let a = breaker(config(1, 1_000, 1), &store, &clock).await;
        let b = breaker(config(1, 1_000, 1), &store, &clock).await;
        fail(&a).await;
        clock.advance(1_000);

        // While a's trial call is in flight, b must not start another.
        let b_rejected = a
            .execute(|| async {
                Ok::<_, String>(matches!(succeed(&b).await, Err(BreakerError::HalfOpenLimit { .. })))
            })
            .await
            .unwrap();

        assert!(b_rejected);
        assert_eq!(a.state().await, CircuitState::Closed);
        assert_eq!(b.state().await, CircuitState::Closed);
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn load(&self, _: &str) -> Result<Option<CircuitBreakerRecord>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn compare_and_swap(
            &self,
            _: &str,
            _: u64,
            _: &CircuitBreakerRecord,
        ) -> Result<CasOutcome, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_store_outage_does_not_block_decisions() {
        let clock = Arc::new(ManualClock::new(T0));
        let cb = CircuitBreaker::initialize(config(2, 30_000, 1), Arc::new(BrokenStore), clock.clone(), 3).await;

        assert_eq!(succeed(&cb).await.unwrap(), 7);
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::CircuitOpen { .. })));

        assert!(cb.reset().await.is_err());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }
}
