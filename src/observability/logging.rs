//! Structured logging and access logs.
//!
//! `RUST_LOG` wins over the configured level. Output is human-readable by
//! default or one JSON object per line with `log_format = "json"`.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{Level, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::RequestIdExt;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("chat_relay={level},tower_http={level}")
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Span per request carrying method, path and request ID.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLogSpan;

impl<B> MakeSpan<B> for AccessLogSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request.request_id(),
        )
    }
}

pub type AccessLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, AccessLogSpan, DefaultOnRequest, DefaultOnResponse>;

/// One INFO line per response with status and latency.
pub fn access_log_layer() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(AccessLogSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
