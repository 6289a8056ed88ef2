//! Router configuration.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{get_status, health_check, AppState};
use super::ws::chat_ws_handler;

/// Create the main router: chat socket, status and health routes.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(chat_ws_handler))
        .route("/ws", get(chat_ws_handler))
        .route("/api/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
        .merge(create_health_router())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}
