//! Registry of per-dependency circuit breakers.
//!
//! Built once at startup from `[[circuit_breakers]]`; the set of names is
//! fixed for the life of the process.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::CircuitBreakerConfig;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerStats};
use crate::resilience::clock::Clock;
use crate::store::StateStore;

#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: BTreeMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// Construct every configured breaker, loading persisted state for all of
    /// them before returning.
    pub async fn initialize(
        configs: &[CircuitBreakerConfig],
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        cas_retries: u32,
    ) -> Self {
        let breakers = join_all(configs.iter().cloned().map(|config| {
            CircuitBreaker::initialize(config, store.clone(), clock.clone(), cas_retries)
        }))
        .await;

        tracing::info!(
            count = breakers.len(),
            store = store.backend(),
            "Circuit breakers initialized"
        );

        Self {
            breakers: breakers
                .into_iter()
                .map(|cb| (cb.name().to_string(), Arc::new(cb)))
                .collect(),
        }
    }

    pub fn get(&self, service: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(service).cloned()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Stats for every breaker, keyed by name.
    pub async fn all_stats(&self) -> BTreeMap<String, CircuitBreakerStats> {
        let mut stats = BTreeMap::new();
        for (name, breaker) in &self.breakers {
            stats.insert(name.clone(), breaker.stats().await);
        }
        stats
    }
}
