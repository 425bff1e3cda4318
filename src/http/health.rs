use axum::Json;
use serde::Serialize;

use crate::http::response::RelayError;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health` liveness probe. Does not touch the upstream.
pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> RelayError {
    RelayError::NotFound
}
