//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum routers for both services
//! - Wire up middleware (request ID, tracing, timeout, panic guard)
//! - Mount circuit-breaker-gated gateway routes
//! - Serve on a listener until shutdown

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{Request, StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::any,
    BoxError, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{GatewayRouteConfig, ResilienceConfig};
use crate::health::HealthAggregator;
use crate::http::circuit_breaker_api::{self, CircuitBreakerApiState};
use crate::http::health_api;
use crate::http::middleware::{catch_panic_middleware, protect};
use crate::http::request::{request_id_header, RequestId};
use crate::http::response::{ApiError, ErrorResponse};
use crate::lifecycle::Shutdown;
use crate::resilience::CircuitBreakerRegistry;

/// Both resilience HTTP services over shared subsystems.
pub struct HttpServer {
    config: ResilienceConfig,
    registry: Arc<CircuitBreakerRegistry>,
    aggregator: Arc<HealthAggregator>,
}

impl HttpServer {
    pub fn new(
        config: ResilienceConfig,
        registry: Arc<CircuitBreakerRegistry>,
        aggregator: Arc<HealthAggregator>,
    ) -> Self {
        Self {
            config,
            registry,
            aggregator,
        }
    }

    /// Circuit breaker API plus any configured gateway routes.
    pub fn circuit_breaker_router(&self) -> Router {
        let api = circuit_breaker_api::router(CircuitBreakerApiState::new(self.registry.clone()));
        let router = self
            .config
            .gateway_routes
            .iter()
            .fold(api, |router, route| router.merge(self.gateway_router(route)));

        with_common_layers(router, self.config.circuit_breaker_service.request_timeout_secs)
    }

    pub fn health_router(&self) -> Router {
        with_common_layers(
            health_api::router(self.aggregator.clone()),
            self.config.health_service.request_timeout_secs,
        )
    }

    fn gateway_router(&self, route: &GatewayRouteConfig) -> Router {
        let Some(breaker) = self.registry.get(&route.service) else {
            tracing::warn!(
                prefix = %route.path_prefix,
                service = %route.service,
                "Gateway route references unknown circuit breaker, skipping"
            );
            return Router::new();
        };

        tracing::info!(prefix = %route.path_prefix, service = %route.service, "Gateway route gated by circuit breaker");
        let gated = Router::new()
            .route(&route.path_prefix, any(no_upstream))
            .route(&format!("{}/{{*rest}}", route.path_prefix), any(no_upstream));
        protect(gated, breaker)
    }

    pub async fn run_circuit_breaker_service(&self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        serve(circuit_breaker_api::SERVICE_NAME, self.circuit_breaker_router(), listener, shutdown).await
    }

    pub async fn run_health_service(&self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        serve(health_api::SERVICE_NAME, self.health_router(), listener, shutdown).await
    }
}

/// Layers shared by both services, outermost last.
pub fn with_common_layers(router: Router, request_timeout_secs: u64) -> Router {
    let header = request_id_header();
    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(move |request_id: RequestId, err: BoxError| async move {
            layer_error(request_id, err, request_timeout_secs)
        }))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs)));

    router
        .layer(middleware::from_fn(catch_panic_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = RequestId::from_headers(req.headers());
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        }))
        .layer(timeout)
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(SetRequestIdLayer::new(header, MakeRequestUuid))
}

/// Render errors from the timeout stack with the usual error body.
fn layer_error(request_id: RequestId, err: BoxError, request_timeout_secs: u64) -> ErrorResponse {
    if err.is::<Elapsed>() {
        tracing::warn!(request_id = %request_id, timeout_secs = request_timeout_secs, "Request timed out");
        return ApiError::Timeout(request_timeout_secs).with_request_id(&request_id);
    }
    tracing::error!(request_id = %request_id, error = %err, "Unhandled middleware error");
    ApiError::Internal("Unhandled middleware error".to_string()).with_request_id(&request_id)
}

/// Serve `router` until `shutdown` triggers, draining in-flight requests.
pub async fn serve(
    service: &'static str,
    router: Router,
    listener: TcpListener,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(service = service, address = %addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    tracing::info!(service = service, "HTTP server stopped");
    Ok(())
}

/// Terminal handler for gated gateway routes; this service does not proxy.
async fn no_upstream(request_id: RequestId, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": "NoUpstream",
            "message": format!("No upstream handler is mounted for {}", uri.path()),
            "requestId": request_id.as_str(),
        })),
    )
}
