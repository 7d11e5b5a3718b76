//! Resilience layer services.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                RESILIENCE LAYER                │
//!                      │                                                │
//!   Gateway / CLI      │  ┌──────────────────┐    ┌──────────────────┐  │
//!   ───────────────────┼─▶│ circuit breaker  │───▶│    registry      │  │
//!                      │  │   service :3005  │    │  (one breaker    │  │
//!                      │  └──────────────────┘    │  per dependency) │  │
//!                      │                          └────────┬─────────┘  │
//!                      │                                   ▼            │     ┌───────┐
//!                      │                          ┌──────────────────┐  │     │       │
//!                      │                          │   state store    │──┼────▶│ redis │
//!                      │                          │ (versioned CAS)  │  │     │       │
//!                      │                          └──────────────────┘  │     └───────┘
//!                      │                                                │
//!   Dashboard / CLI    │  ┌──────────────────┐    ┌──────────────────┐  │     ┌──────────┐
//!   ───────────────────┼─▶│  health service  │───▶│   aggregator     │──┼────▶│ replicas │
//!                      │  │      :3006       │    │ + prober + cache │  │     └──────────┘
//!                      │  └──────────────────┘    └──────────────────┘  │
//!                      └────────────────────────────────────────────────┘
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use resilience_layer::config::resolve_config;
use resilience_layer::health::{HealthAggregator, HealthMonitor};
use resilience_layer::lifecycle::{shutdown_on_signal, Shutdown};
use resilience_layer::observability::{logging, metrics};
use resilience_layer::resilience::{CircuitBreakerRegistry, SystemClock};
use resilience_layer::{store, HttpServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ServiceMode {
    /// Run both services in one process.
    Both,
    CircuitBreaker,
    HealthCheck,
}

#[derive(Parser)]
#[command(name = "resilience-layer", version)]
#[command(about = "Circuit breaker and health check services", long_about = None)]
struct Cli {
    /// Path to a TOML config file (falls back to RESILIENCE_CONFIG, then defaults).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which service(s) to run.
    #[arg(short, long, value_enum, default_value_t = ServiceMode::Both)]
    service: ServiceMode,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), mode = ?cli.service, "resilience-layer starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let run_breakers = cli.service != ServiceMode::HealthCheck;
    let run_health = cli.service != ServiceMode::CircuitBreaker;

    let registry = if run_breakers {
        let store = store::connect(&config.store).await?;
        CircuitBreakerRegistry::initialize(
            &config.circuit_breakers,
            store,
            Arc::new(SystemClock),
            config.store.cas_retries,
        )
        .await
    } else {
        CircuitBreakerRegistry::default()
    };

    let aggregator = Arc::new(HealthAggregator::new(
        config.services.clone(),
        Duration::from_millis(config.health.cache_ttl_ms),
    ));

    let server = HttpServer::new(config.clone(), Arc::new(registry), aggregator.clone());

    let breaker_service = async {
        if !run_breakers {
            return Ok::<(), std::io::Error>(());
        }
        let listener = TcpListener::bind(&config.circuit_breaker_service.bind_address).await?;
        server.run_circuit_breaker_service(listener, shutdown.clone()).await
    };

    let health_service = async {
        if !run_health {
            return Ok::<(), std::io::Error>(());
        }
        let monitor = HealthMonitor::new(aggregator.clone(), config.health.interval_secs);
        tokio::spawn(monitor.run(shutdown.subscribe()));

        let listener = TcpListener::bind(&config.health_service.bind_address).await?;
        server.run_health_service(listener, shutdown.clone()).await
    };

    let result: std::io::Result<((), ())> = tokio::try_join!(breaker_service, health_service);
    if let Err(e) = result {
        tracing::error!(error = %e, "Server failed");
        shutdown.trigger();
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
