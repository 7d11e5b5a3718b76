//! Health Check Service HTTP API.
//!
//! # Routes
//! - `GET /health`: liveness
//! - `GET /check/all`: fresh probe of every service
//! - `GET /check/{serviceName}`: cache-aware probe of one service
//! - `GET /status`: system verdict, 503 while a critical service is down
//! - `GET /report`: per-service detail with average latency
//! - `GET /metrics`: numbers-only view

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::health::aggregator::{summarize, HealthAggregator};
use crate::http::request::RequestId;
use crate::http::response::{ApiError, ErrorResponse};
use crate::resilience::clock::epoch_ms;

pub const SERVICE_NAME: &str = "health-check-service";

pub fn router(aggregator: Arc<HealthAggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/check/all", get(check_all))
        .route("/check/{service_name}", get(check_service))
        .route("/status", get(status))
        .route("/report", get(report))
        .route("/metrics", get(metrics))
        .with_state(aggregator)
}

async fn health(request_id: RequestId) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": epoch_ms(),
        "requestId": request_id.as_str(),
    }))
}

async fn check_all(State(aggregator): State<Arc<HealthAggregator>>, request_id: RequestId) -> Json<Value> {
    let results = aggregator.check_all_services_health().await;
    let summary = summarize(&results);

    let services: Map<String, Value> = results
        .iter()
        .map(|r| (r.service.clone(), json!(r)))
        .collect();

    Json(json!({
        "services": services,
        "systemHealth": summary.system_health,
        "summary": summary,
        "timestamp": epoch_ms(),
        "requestId": request_id.as_str(),
    }))
}

async fn check_service(
    State(aggregator): State<Arc<HealthAggregator>>,
    Path(service_name): Path<String>,
    request_id: RequestId,
) -> Result<Json<Value>, ErrorResponse> {
    let (result, cached) = aggregator
        .check_service(&service_name)
        .await
        .ok_or_else(|| ApiError::ServiceNotFound(service_name.clone()).with_request_id(&request_id))?;

    Ok(Json(json!({
        "service": result,
        "cached": cached,
        "timestamp": epoch_ms(),
        "requestId": request_id.as_str(),
    })))
}

async fn status(State(aggregator): State<Arc<HealthAggregator>>, request_id: RequestId) -> (StatusCode, Json<Value>) {
    let results = aggregator.check_all_services_health().await;
    let summary = summarize(&results);

    let services: Map<String, Value> = results
        .iter()
        .map(|r| {
            (
                r.service.clone(),
                json!({
                    "name": r.name,
                    "healthy": r.overall_health,
                    "healthPercentage": r.health_percentage,
                    "critical": r.critical,
                }),
            )
        })
        .collect();

    let (code, label) = if summary.system_health {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(json!({
            "status": label,
            "systemHealth": summary.system_health,
            "summary": summary,
            "services": services,
            "timestamp": epoch_ms(),
            "requestId": request_id.as_str(),
        })),
    )
}

async fn report(State(aggregator): State<Arc<HealthAggregator>>, request_id: RequestId) -> Json<Value> {
    let report = aggregator.report().await;
    Json(json!({
        "report": report,
        "requestId": request_id.as_str(),
    }))
}

async fn metrics(State(aggregator): State<Arc<HealthAggregator>>, request_id: RequestId) -> Json<Value> {
    let metrics = aggregator.metrics().await;
    Json(json!({
        "metrics": metrics,
        "requestId": request_id.as_str(),
    }))
}
