//! Error responses.
//!
//! Every failure leaves the relay as `{"error": "<message>"}` with a status
//! that tells the client whether retrying can help. Upstream details stay in
//! the logs.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::relay::RequestError;
use crate::upstream::UpstreamError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Anything that can go wrong while relaying a chat request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("expected `Content-Type: application/json`")]
    UnsupportedMediaType,
    #[error("request body is too large")]
    PayloadTooLarge,
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("origin not allowed")]
    OriginNotAllowed,
    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("request timed out")]
    RequestTimeout,
    #[error("not found")]
    NotFound,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidJson(_) | RelayError::Request(_) => StatusCode::BAD_REQUEST,
            RelayError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::OriginNotAllowed => StatusCode::FORBIDDEN,
            RelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Upstream(e) => e.client_status(),
            RelayError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Message shown to the client.
    fn public_message(&self) -> String {
        match self {
            RelayError::Upstream(UpstreamError::Timeout) | RelayError::RequestTimeout => {
                "The assistant took too long to respond".to_string()
            }
            RelayError::Upstream(_) => "The assistant is unavailable right now".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return RelayError::PayloadTooLarge;
        }
        match rejection {
            JsonRejection::MissingJsonContentType(_) => RelayError::UnsupportedMediaType,
            other => RelayError::InvalidJson(other.body_text()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            RelayError::Upstream(e) => {
                tracing::error!(error = %e, status = %status, "Upstream call failed");
            }
            RelayError::RequestTimeout => {
                tracing::warn!(status = %status, "Request deadline exceeded");
            }
            RelayError::RateLimited { .. } | RelayError::OriginNotAllowed => {
                tracing::warn!(error = %self, "Request refused");
            }
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        let mut response = (status, Json(ErrorBody { error: self.public_message() })).into_response();
        if let RelayError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let response = RelayError::from(RequestError::NoMessages).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "messages must contain at least one message"})
        );
    }

    #[tokio::test]
    async fn test_upstream_details_are_hidden() {
        let err = UpstreamError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid api key sk-abc".into(),
        };
        let response = RelayError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "The assistant is unavailable right now");
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_gateway_timeout() {
        let response = RelayError::from(UpstreamError::Timeout).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = RelayError::RequestTimeout.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "The assistant took too long to respond"})
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = RelayError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
