//! TTL cache of service health results.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::health::aggregator::ServiceHealthResult;

#[derive(Debug, Clone)]
struct CachedResult {
    result: ServiceHealthResult,
    cached_at: Instant,
}

/// In-process cache keyed by service key. Lost on restart.
#[derive(Debug)]
pub struct HealthCache {
    entries: DashMap<String, CachedResult>,
    ttl: Duration,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// A hit only while `now - cached_at < ttl`.
    pub fn get(&self, service: &str) -> Option<ServiceHealthResult> {
        let entry = self.entries.get(service)?;
        if entry.cached_at.elapsed() < self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, result: ServiceHealthResult) {
        self.entries.insert(
            result.service.clone(),
            CachedResult {
                result,
                cached_at: Instant::now(),
            },
        );
    }
}
