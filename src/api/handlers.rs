// src/api/handlers.rs
// Small plain-JSON endpoints.

use axum::Json;

use super::types::StatusResponse;
use crate::story::ENGINE_VERSION;

/// `GET /health`
pub async fn health_handler() -> &'static str {
    "OK"
}

/// `GET /api/status`
pub async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        engine: ENGINE_VERSION,
        version: env!("CARGO_PKG_VERSION"),
    })
}
