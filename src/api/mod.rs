use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{headers, metrics};
use crate::AppState;

pub mod handlers;

/// Build the full application router: health, metrics and the `/v2` API.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and metrics endpoints (no token)
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .nest("/v2", api_router())
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(headers::request_id))
        .layer(axum::middleware::from_fn(headers::security_headers))
}

/// Token-gated routes. The caller mounts this under `/v2`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/hiscore",
            get(handlers::get_hiscore).post(handlers::post_hiscore),
        )
        .route("/hiscore/latest", get(handlers::get_hiscore_latest))
        .route("/tokens", post(handlers::create_token))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
