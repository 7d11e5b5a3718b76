//! Process-local state store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::resilience::state::CircuitBreakerRecord;
use crate::store::{CasOutcome, StateStore, StoreError};

/// A thread-safe map of service name -> record.
///
/// Cloning shares the underlying map, which lets tests stand up several
/// breakers for the same dependency the way separate processes would share
/// a redis instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, CircuitBreakerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional write, for seeding state.
    pub fn insert(&self, service: &str, record: CircuitBreakerRecord) {
        self.records.insert(service.to_string(), record);
    }

    pub fn get(&self, service: &str) -> Option<CircuitBreakerRecord> {
        self.records.get(service).map(|r| r.value().clone())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, service: &str) -> Result<Option<CircuitBreakerRecord>, StoreError> {
        Ok(self.get(service))
    }

    async fn compare_and_swap(
        &self,
        service: &str,
        expected_version: u64,
        record: &CircuitBreakerRecord,
    ) -> Result<CasOutcome, StoreError> {
        match self.records.entry(service.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().version != expected_version {
                    return Ok(CasOutcome::Conflict(entry.get().clone()));
                }
                entry.insert(record.clone());
            }
            Entry::Vacant(entry) => {
                if expected_version != 0 {
                    return Ok(CasOutcome::Conflict(CircuitBreakerRecord::default()));
                }
                entry.insert(record.clone());
            }
        }
        Ok(CasOutcome::Applied)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
