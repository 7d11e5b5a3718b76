//! Integration tests for the circuit breaker service.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use resilience_layer::config::{CircuitBreakerConfig, GatewayRouteConfig, ResilienceConfig};
use resilience_layer::resilience::{CircuitBreakerRecord, CircuitState};
use resilience_layer::store::MemoryStore;
use serde_json::{json, Value};

mod common;

fn config() -> ResilienceConfig {
    let mut config = ResilienceConfig::default();
    config.circuit_breakers = vec![
        CircuitBreakerConfig::new("trading_service", 3, 60_000, 60_000, 1),
        CircuitBreakerConfig::new("user_service", 5, 30_000, 60_000, 3),
    ];
    config
}

/// Backend that counts hits and answers with `status`.
async fn counting_backend(status: u16) -> (String, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let addr = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (status, r#"{"ok":true}"#.to_string())
        }
    })
    .await;
    (format!("http://{}/orders", addr), hits)
}

#[tokio::test]
async fn test_health_echoes_request_id() {
    let app = common::spawn_app(config()).await;

    let res = common::client()
        .get(format!("{}/health", app.breaker_url))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "req-42");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "circuit-breaker-service");
    assert_eq!(body["requestId"], "req-42");
}

#[tokio::test]
async fn test_status_lists_registered_breakers() {
    let app = common::spawn_app(config()).await;
    let client = common::client();

    let body: Value = client
        .get(format!("{}/status", app.breaker_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let breakers = body["circuitBreakers"].as_object().unwrap();
    assert_eq!(breakers.len(), 2);
    assert_eq!(breakers["trading_service"]["state"], "CLOSED");
    assert_eq!(breakers["trading_service"]["failureThreshold"], 3);
    assert!(body["requestId"].is_string());

    let res = client
        .get(format!("{}/status/user_service", app.breaker_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["circuitBreaker"]["service"], "user_service");
    assert_eq!(body["circuitBreaker"]["halfOpenMaxCalls"], 3);
}

#[tokio::test]
async fn test_unknown_service_is_404() {
    let app = common::spawn_app(config()).await;
    let client = common::client();

    for res in [
        client.get(format!("{}/status/ghost", app.breaker_url)).send().await.unwrap(),
        client.post(format!("{}/reset/ghost", app.breaker_url)).send().await.unwrap(),
        client
            .post(format!("{}/test/ghost", app.breaker_url))
            .json(&json!({"url": "http://127.0.0.1:1/"}))
            .send()
            .await
            .unwrap(),
    ] {
        assert_eq!(res.status(), 404);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "CircuitBreakerNotFound");
        assert!(body["requestId"].is_string());
    }
}

#[tokio::test]
async fn test_test_call_requires_url() {
    let app = common::spawn_app(config()).await;
    let client = common::client();

    let res = client
        .post(format!("{}/test/trading_service", app.breaker_url))
        .json(&json!({"method": "GET"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "ValidationError");

    let res = client
        .post(format!("{}/test/trading_service", app.breaker_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_successful_test_call_returns_result_and_state() {
    let app = common::spawn_app(config()).await;
    let (url, hits) = counting_backend(200).await;

    let res = common::client()
        .post(format!("{}/test/trading_service", app.breaker_url))
        .json(&json!({"url": url, "method": "post", "data": {"symbol": "ETH"}}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["ok"], true);
    assert_eq!(body["circuitBreakerState"], "CLOSED");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failures_open_the_circuit_and_fail_fast() {
    let app = common::spawn_app(config()).await;
    let client = common::client();
    let (url, hits) = counting_backend(500).await;

    for expected_state in ["CLOSED", "CLOSED", "OPEN"] {
        let res = client
            .post(format!("{}/test/trading_service", app.breaker_url))
            .json(&json!({"url": url}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 500);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["circuitBreakerState"], expected_state);
    }

    let res = client
        .post(format!("{}/test/trading_service", app.breaker_url))
        .json(&json!({"url": url}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "CircuitBreakerOpen");
    assert_eq!(body["circuitBreakerState"], "OPEN");
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let stored = app.store.get("trading_service").unwrap();
    assert_eq!(stored.state, CircuitState::Open);
    assert_eq!(stored.failure_count, 3);
}

#[tokio::test]
async fn test_reset_closes_an_open_circuit() {
    let store = MemoryStore::new();
    store.insert(
        "trading_service",
        CircuitBreakerRecord {
            state: CircuitState::Open,
            failure_count: 3,
            last_failure_time: resilience_layer::resilience::clock::epoch_ms(),
            version: 7,
            ..Default::default()
        },
    );
    let app = common::spawn_app_with_store(config(), store).await;
    let client = common::client();

    let body: Value = client
        .get(format!("{}/status/trading_service", app.breaker_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["circuitBreaker"]["state"], "OPEN");

    let res = client
        .post(format!("{}/reset/trading_service", app.breaker_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let body: Value = client
        .get(format!("{}/status/trading_service", app.breaker_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["circuitBreaker"]["state"], "CLOSED");
    assert_eq!(body["circuitBreaker"]["failureCount"], 0);
    assert_eq!(body["circuitBreaker"]["lastFailureTime"], 0);

    let stored = app.store.get("trading_service").unwrap();
    assert_eq!(stored.state, CircuitState::Closed);
    assert_eq!(stored.version, 8);
}

#[tokio::test]
async fn test_gateway_route_is_gated_by_breaker() {
    let mut config = config();
    config.gateway_routes.push(GatewayRouteConfig {
        path_prefix: "/api/trading".to_string(),
        service: "trading_service".to_string(),
    });
    let app = common::spawn_app(config).await;
    let client = common::client();

    let res = client
        .get(format!("{}/api/trading/orders/1", app.breaker_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NoUpstream");

    let (url, _) = counting_backend(503).await;
    for _ in 0..3 {
        client
            .post(format!("{}/test/trading_service", app.breaker_url))
            .json(&json!({"url": url}))
            .send()
            .await
            .unwrap();
    }

    let res = client
        .get(format!("{}/api/trading", app.breaker_url))
        .header("x-request-id", "gate-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["circuitBreakerState"], "OPEN");
    assert_eq!(body["requestId"], "gate-1");
}
