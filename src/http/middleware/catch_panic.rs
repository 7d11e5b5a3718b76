//! Last-resort panic handler.
//! Turns a panicking handler into `500 {error, requestId}` without leaking
//! the panic message to the client.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::http::request::RequestId;
use crate::http::response::internal_server_error;

pub async fn catch_panic_middleware(req: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::from_headers(req.headers());
    let path = req.uri().path().to_string();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                request_id = %request_id,
                path = %path,
                panic = %message,
                "Handler panicked"
            );
            internal_server_error(&request_id)
        }
    }
}
