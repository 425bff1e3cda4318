//! Request size and time limits.
//!
//! Bodies over `limits.max_body_bytes` get 413 Payload Too Large. A declared
//! `Content-Length` over the limit is refused before the body is read; an
//! undeclared body is cut off while the JSON extractor buffers it. Both paths
//! answer with the usual JSON error body.

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::LimitsConfig;
use crate::http::RelayError;

pub fn body_limit_layer(limits: &LimitsConfig) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limits.max_body_bytes)
}

/// axum applies its own 2MB default inside extractors; the layer above is
/// the single source of truth.
pub fn disable_default_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::disable()
}

/// Refuse a declared `Content-Length` over `max_body_bytes`.
///
/// Sits outside [`body_limit_layer`], which would otherwise answer with a
/// plain-text 413 of its own.
pub async fn declared_length_guard(
    State(max_body_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if declared.is_some_and(|len| len > max_body_bytes as u64) {
        return Err(RelayError::PayloadTooLarge);
    }
    Ok(next.run(request).await)
}

/// Whole-request deadline. An expired request gets 504 with a JSON body.
pub async fn request_deadline(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    tokio::time::timeout(limit, next.run(request))
        .await
        .map_err(|_| RelayError::RequestTimeout)
}
