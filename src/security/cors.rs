//! Origin restriction.
//!
//! Two pieces share the allow-list:
//! - `cors_layer` answers preflights and sets `Access-Control-*` headers,
//!   so browsers on other origins cannot read responses.
//! - `origin_guard` refuses requests from other origins with 403 before
//!   they cost an upstream call. Requests without `Origin` pass.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::http::response::RelayError;
use crate::http::X_REQUEST_ID;
use crate::security::rate_limit::{RATELIMIT_LIMIT, RATELIMIT_REMAINING, RATELIMIT_RESET};

/// Parsed allow-list.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    any: bool,
    allowed: HashSet<HeaderValue>,
    reject_disallowed: bool,
}

impl OriginPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let any = config.allowed_origins.iter().any(|o| o == "*");
        let allowed = config
            .allowed_origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        Self {
            any,
            allowed,
            reject_disallowed: config.reject_disallowed,
        }
    }

    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.any || self.allowed.contains(origin)
    }
}

/// Build the CORS layer for the allow-list.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let policy = OriginPolicy::from_config(config);
    let allow_origin = if policy.any {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(policy.allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, X_REQUEST_ID])
        .expose_headers([
            X_REQUEST_ID,
            header::RETRY_AFTER,
            RATELIMIT_LIMIT,
            RATELIMIT_REMAINING,
            RATELIMIT_RESET,
        ])
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// Middleware refusing requests from origins outside the allow-list.
pub async fn origin_guard(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if policy.reject_disallowed {
        if let Some(origin) = request.headers().get(header::ORIGIN) {
            if !policy.is_allowed(origin) {
                tracing::warn!(origin = ?origin, "Origin not allowed");
                return RelayError::OriginNotAllowed.into_response();
            }
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origins: &[&str]) -> OriginPolicy {
        OriginPolicy::from_config(&CorsConfig {
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..CorsConfig::default()
        })
    }

    #[test]
    fn test_exact_match_only() {
        let policy = policy(&["https://app.example.com"]);
        assert!(policy.is_allowed(&HeaderValue::from_static("https://app.example.com")));
        assert!(!policy.is_allowed(&HeaderValue::from_static("https://evil.example.com")));
        assert!(!policy.is_allowed(&HeaderValue::from_static("http://app.example.com")));
    }

    #[test]
    fn test_wildcard_allows_everything() {
        let policy = policy(&["*"]);
        assert!(policy.is_allowed(&HeaderValue::from_static("https://anywhere.test")));
    }

    #[test]
    fn test_empty_list_allows_nothing() {
        let policy = policy(&[]);
        assert!(!policy.is_allowed(&HeaderValue::from_static("http://localhost:3000")));
    }
}
