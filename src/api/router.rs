// src/api/router.rs
// HTTP router composition.

use std::sync::Arc;

use axum::{
    http::{header::HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use super::generate::generate_story_handler;
use super::handlers::{health_handler, status_handler};
use crate::config::CONFIG;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/stories/generate", post(generate_story_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-story-engine"),
            HeaderValue::from_static(concat!("tucktale/", env!("CARGO_PKG_VERSION"))),
        ))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    match CONFIG.cors_origin.as_str() {
        "*" => base.allow_origin(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => base.allow_origin(value),
            Err(_) => {
                warn!(origin, "invalid TALE_CORS_ORIGIN, allowing any origin");
                base.allow_origin(Any)
            }
        },
    }
}
