//! Circuit Breaker Service HTTP API.
//!
//! # Routes
//! - `GET /health`: liveness
//! - `GET /status`: stats for every breaker
//! - `GET /status/{serviceName}`: stats for one breaker
//! - `POST /reset/{serviceName}`: administrative reset
//! - `POST /test/{serviceName}`: run an ad-hoc HTTP call through a breaker

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::http::request::RequestId;
use crate::http::response::{ApiError, ErrorResponse};
use crate::resilience::clock::epoch_ms;
use crate::resilience::{BreakerError, CircuitBreaker, CircuitBreakerRegistry};

pub const SERVICE_NAME: &str = "circuit-breaker-service";

/// Deadline for the outbound call made by `/test`.
const TEST_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by the circuit breaker handlers.
#[derive(Clone)]
pub struct CircuitBreakerApiState {
    pub registry: Arc<CircuitBreakerRegistry>,
    pub client: reqwest::Client,
}

impl CircuitBreakerApiState {
    pub fn new(registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
        }
    }

    fn breaker(&self, service: &str, request_id: &RequestId) -> Result<Arc<CircuitBreaker>, ErrorResponse> {
        self.registry
            .get(service)
            .ok_or_else(|| ApiError::CircuitBreakerNotFound(service.to_string()).with_request_id(request_id))
    }
}

pub fn router(state: CircuitBreakerApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(all_status))
        .route("/status/{service_name}", get(service_status))
        .route("/reset/{service_name}", post(reset))
        .route("/test/{service_name}", post(test_call))
        .with_state(state)
}

async fn health(request_id: RequestId) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": epoch_ms(),
        "requestId": request_id.as_str(),
    }))
}

async fn all_status(State(state): State<CircuitBreakerApiState>, request_id: RequestId) -> Json<Value> {
    let stats = state.registry.all_stats().await;
    Json(json!({
        "circuitBreakers": stats,
        "timestamp": epoch_ms(),
        "requestId": request_id.as_str(),
    }))
}

async fn service_status(
    State(state): State<CircuitBreakerApiState>,
    Path(service_name): Path<String>,
    request_id: RequestId,
) -> Result<Json<Value>, ErrorResponse> {
    let breaker = state.breaker(&service_name, &request_id)?;
    Ok(Json(json!({
        "circuitBreaker": breaker.stats().await,
        "requestId": request_id.as_str(),
    })))
}

async fn reset(
    State(state): State<CircuitBreakerApiState>,
    Path(service_name): Path<String>,
    request_id: RequestId,
) -> Result<Json<Value>, ErrorResponse> {
    let breaker = state.breaker(&service_name, &request_id)?;
    breaker
        .reset()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&request_id))?;

    tracing::info!(request_id = %request_id, service = %service_name, "Circuit breaker reset via API");
    Ok(Json(json!({
        "success": true,
        "message": format!("Circuit breaker for {} has been reset", service_name),
        "requestId": request_id.as_str(),
    })))
}

/// Body of `POST /test/{serviceName}`.
#[derive(Debug, Default, Deserialize)]
struct TestCallRequest {
    url: Option<String>,
    method: Option<String>,
    data: Option<Value>,
}

async fn test_call(
    State(state): State<CircuitBreakerApiState>,
    Path(service_name): Path<String>,
    request_id: RequestId,
    body: Bytes,
) -> Result<Response, ErrorResponse> {
    let breaker = state.breaker(&service_name, &request_id)?;

    let request: TestCallRequest = if body.is_empty() {
        TestCallRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::Validation(format!("Invalid JSON body: {}", e)).with_request_id(&request_id)
        })?
    };

    let url = match request.url.filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => return Err(ApiError::Validation("url is required".to_string()).with_request_id(&request_id)),
    };

    let method = request.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
    let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|_| {
        ApiError::Validation(format!("Unsupported method: {}", method)).with_request_id(&request_id)
    })?;

    let outcome = breaker
        .execute(|| async {
            let mut call = state.client.request(method, &url).timeout(TEST_CALL_TIMEOUT);
            if let Some(data) = &request.data {
                call = call.json(data);
            }
            let response = call.send().await?.error_for_status()?;
            let text = response.text().await?;
            Ok::<_, reqwest::Error>(serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text)))
        })
        .await;

    let circuit_state = breaker.state().await;

    let response = match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "result": result,
                "circuitBreakerState": circuit_state,
                "requestId": request_id.as_str(),
            })),
        ),
        Err(e) => {
            let status = if e.is_rejection() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let error = match &e {
                BreakerError::CircuitOpen { .. } => "CircuitBreakerOpen".to_string(),
                BreakerError::HalfOpenLimit { .. } => "CircuitBreakerHalfOpen".to_string(),
                BreakerError::Operation(err) => err.to_string(),
            };
            tracing::warn!(
                request_id = %request_id,
                service = %service_name,
                state = %circuit_state,
                error = %e,
                "Test call through circuit breaker failed"
            );
            (
                status,
                Json(json!({
                    "success": false,
                    "error": error,
                    "message": e.to_string(),
                    "circuitBreakerState": circuit_state,
                    "requestId": request_id.as_str(),
                })),
            )
        }
    };

    Ok(response.into_response())
}
