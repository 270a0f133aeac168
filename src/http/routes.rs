//! Routes served by the gateway binary.

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::middleware::RateLimitState;
use crate::ratelimit::LogStore;

/// Build the gateway router.
///
/// `/health` is served outside the limiter so that probes are never
/// rejected. Every other path is rate limited and answered by a placeholder
/// handler standing in for the protected application.
pub fn app_router<S: LogStore + 'static>(state: RateLimitState<S>) -> Router {
    let limited = state.apply(Router::new().fallback(echo_handler));

    Router::new()
        .route("/health", get(health_handler))
        .merge(limited)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn echo_handler(request: Request) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "method": request.method().as_str(),
        "path": request.uri().path(),
    }))
}
