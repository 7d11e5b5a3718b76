//! API error responses.
//!
//! # Responsibilities
//! - Map domain errors to HTTP status codes
//! - Render the JSON error body with the request ID
//!
//! # Design Decisions
//! - Error bodies never carry internal details beyond a message
//! - Every error body is `{error, message, requestId, timestamp}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::http::request::RequestId;
use crate::resilience::clock::epoch_ms;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No circuit breaker registered for service '{0}'")]
    CircuitBreakerNotFound(String),

    #[error("No health configuration for service '{0}'")]
    ServiceNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to persist circuit breaker state: {0}")]
    Store(#[from] StoreError),

    #[error("Request did not complete within {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::CircuitBreakerNotFound(_) | ApiError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::CircuitBreakerNotFound(_) => "CircuitBreakerNotFound",
            ApiError::ServiceNotFound(_) => "ServiceNotFound",
            ApiError::Validation(_) => "ValidationError",
            ApiError::Store(_) => "StoreUnavailable",
            ApiError::Timeout(_) => "RequestTimeout",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }

    pub fn with_request_id(self, request_id: &RequestId) -> ErrorResponse {
        ErrorResponse {
            error: self,
            request_id: request_id.clone(),
        }
    }
}

/// An [`ApiError`] bound to the request it answers.
#[derive(Debug)]
pub struct ErrorResponse {
    error: ApiError,
    request_id: RequestId,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if status.is_server_error() {
            tracing::error!(request_id = %self.request_id, error = %self.error, "Request failed");
        }
        let body = json!({
            "error": self.error.kind(),
            "message": self.error.to_string(),
            "requestId": self.request_id.as_str(),
            "timestamp": epoch_ms(),
        });
        (status, Json(body)).into_response()
    }
}

/// Body for unexpected failures caught at the outermost layer.
pub fn internal_server_error(request_id: &RequestId) -> Response {
    let body = json!({
        "error": "Internal Server Error",
        "requestId": request_id.as_str(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
