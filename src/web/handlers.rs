//! HTTP handlers and shared application state.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::chat::ChatRegistry;

use super::ws::Keepalive;

/// State shared by all routes.
pub struct AppState {
    /// Connection registry.
    pub registry: Arc<ChatRegistry>,
    /// Transport keepalive settings for new sockets.
    pub keepalive: Keepalive,
    /// Port reported by the status endpoint.
    pub websocket_port: u16,
}

impl AppState {
    /// Create application state around an existing registry.
    pub fn new(registry: Arc<ChatRegistry>, keepalive: Keepalive, websocket_port: u16) -> Self {
        Self {
            registry,
            keepalive,
            websocket_port,
        }
    }
}

/// Server status response.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Port the chat WebSocket listens on.
    pub websocket_port: u16,
    /// Current user count.
    pub online_users: usize,
    /// Whether chat is available.
    pub chat_enabled: bool,
}

/// Server status.
///
/// GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        websocket_port: state.websocket_port,
        online_users: state.registry.user_count().await,
        chat_enabled: true,
    })
}

/// Health check handler.
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
