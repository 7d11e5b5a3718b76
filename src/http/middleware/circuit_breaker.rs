//! Circuit Breaker Gate Middleware.
//! Rejects requests with 503 while the guarding breaker refuses calls.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::http::request::RequestId;
use crate::resilience::{BreakerError, CircuitBreaker};

pub async fn circuit_breaker_middleware(
    State(breaker): State<Arc<CircuitBreaker>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // The real call happens downstream in the handler; the breaker only
    // decides admission here.
    let admitted = breaker.execute(|| async { Ok::<_, Infallible>(()) }).await;

    match admitted {
        Ok(()) => next.run(req).await,
        Err(e) => {
            let request_id = RequestId::from_headers(req.headers());
            tracing::warn!(
                request_id = %request_id,
                service = %breaker.name(),
                path = %req.uri().path(),
                "Request blocked by circuit breaker"
            );
            let error = match e {
                BreakerError::HalfOpenLimit { .. } => "CircuitBreakerHalfOpen",
                _ => "CircuitBreakerOpen",
            };
            let state = breaker.state().await;
            let body = json!({
                "error": error,
                "message": e.to_string(),
                "service": breaker.name(),
                "circuitBreakerState": state,
                "requestId": request_id.as_str(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// Gate every route of `router` behind `breaker`.
pub fn protect<S>(router: Router<S>, breaker: Arc<CircuitBreaker>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(breaker, circuit_breaker_middleware))
}
