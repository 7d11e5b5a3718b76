//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resilience_layer::config::ResilienceConfig;
use resilience_layer::health::HealthAggregator;
use resilience_layer::resilience::{CircuitBreakerRegistry, SystemClock};
use resilience_layer::store::MemoryStore;
use resilience_layer::{HttpServer, Shutdown};

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        204 => "204 No Content",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a simple mock backend that returns a fixed status and body.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Both services running on ephemeral ports over a shared in-memory store.
#[allow(dead_code)]
pub struct TestApp {
    pub breaker_url: String,
    pub health_url: String,
    pub store: MemoryStore,
    pub shutdown: Shutdown,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

#[allow(dead_code)]
pub async fn spawn_app(config: ResilienceConfig) -> TestApp {
    spawn_app_with_store(config, MemoryStore::new()).await
}

pub async fn spawn_app_with_store(config: ResilienceConfig, store: MemoryStore) -> TestApp {
    let registry = CircuitBreakerRegistry::initialize(
        &config.circuit_breakers,
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        config.store.cas_retries,
    )
    .await;
    let aggregator = Arc::new(HealthAggregator::new(
        config.services.clone(),
        Duration::from_millis(config.health.cache_ttl_ms),
    ));
    let server = Arc::new(HttpServer::new(config, Arc::new(registry), aggregator));
    let shutdown = Shutdown::new();

    let breaker_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let health_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let breaker_url = format!("http://{}", breaker_listener.local_addr().unwrap());
    let health_url = format!("http://{}", health_listener.local_addr().unwrap());

    {
        let server = server.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run_circuit_breaker_service(breaker_listener, shutdown).await;
        });
    }
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run_health_service(health_listener, shutdown).await;
        });
    }

    TestApp {
        breaker_url,
        health_url,
        store,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
