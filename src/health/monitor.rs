//! Background health refresh.
//!
//! # Responsibilities
//! - Periodically probe every configured service
//! - Keep the aggregator's cache warm for cache-aware readers

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::health::aggregator::{summarize, HealthAggregator};

pub struct HealthMonitor {
    aggregator: Arc<HealthAggregator>,
    interval_secs: u64,
}

impl HealthMonitor {
    pub fn new(aggregator: Arc<HealthAggregator>, interval_secs: u64) -> Self {
        Self {
            aggregator,
            interval_secs,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval_secs == 0 {
            tracing::info!("Background health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.interval_secs,
            services = self.aggregator.services().len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_all(&self) {
        let results = self.aggregator.check_all_services_health().await;
        let summary = summarize(&results);

        if summary.system_health {
            tracing::debug!(
                healthy = summary.healthy_services,
                total = summary.total_services,
                "Periodic health check complete"
            );
        } else {
            tracing::warn!(
                healthy_critical = summary.healthy_critical_services,
                critical = summary.critical_services,
                "Periodic health check: critical service down"
            );
        }
    }
}
