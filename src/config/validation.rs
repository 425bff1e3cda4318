//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All problems are reported at once, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("upstream.base_url `{0}` is not an http(s) URL")]
    UpstreamUrl(String),
    #[error("no upstream API key: set upstream.api_key or the `{0}` environment variable")]
    MissingApiKey(String),
    #[error("upstream.default_model must not be empty")]
    EmptyModel,
    #[error("upstream.temperature {0} is outside 0.0..=2.0")]
    Temperature(f32),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("cors.allowed_origins entry `{0}` is not a valid origin")]
    Origin(String),
    #[error("prompt.system_prompt must not be empty")]
    EmptyPrompt,
    #[error("upstream.timeout_secs ({upstream}) must be less than timeouts.request_secs ({request})")]
    TimeoutOrder { upstream: u64, request: u64 },
}

/// Check a configuration, returning every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let upstream = &config.upstream;
    match Url::parse(&upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::UpstreamUrl(upstream.base_url.clone())),
    }
    if upstream.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey(upstream.api_key_env.clone()));
    }
    if upstream.default_model.trim().is_empty() {
        errors.push(ValidationError::EmptyModel);
    }
    if let Some(t) = upstream.temperature {
        if !(0.0..=2.0).contains(&t) {
            errors.push(ValidationError::Temperature(t));
        }
    }
    if upstream.max_tokens == Some(0) {
        errors.push(ValidationError::Zero("upstream.max_tokens"));
    }
    if upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.timeout_secs"));
    }
    if upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }

    for origin in &config.cors.allowed_origins {
        if origin != "*" && !is_valid_origin(origin) {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::Zero("rate_limit.window_secs"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::Zero("rate_limit.max_requests"));
        }
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }
    if config.limits.max_messages == 0 {
        errors.push(ValidationError::Zero("limits.max_messages"));
    }
    if config.limits.max_message_chars == 0 {
        errors.push(ValidationError::Zero("limits.max_message_chars"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    } else if upstream.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::TimeoutOrder {
            upstream: upstream.timeout_secs,
            request: config.timeouts.request_secs,
        });
    }

    if config.prompt.system_prompt.trim().is_empty() {
        errors.push(ValidationError::EmptyPrompt);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is `scheme://host[:port]` with nothing after the authority.
fn is_valid_origin(origin: &str) -> bool {
    if HeaderValue::from_str(origin).is_err() {
        return false;
    }
    match Url::parse(origin) {
        Ok(url) => {
            url.host_str().is_some()
                && url.path() == "/"
                && !origin.ends_with('/')
                && url.query().is_none()
        }
        Err(_) => false,
    }
}
