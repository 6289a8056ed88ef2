//! Web transport for the chat relay.
//!
//! This module provides the WebSocket chat endpoint plus a small HTTP
//! surface for health and status checks.

pub mod handlers;
pub mod router;
pub mod server;
pub mod ws;

pub use handlers::{AppState, StatusResponse};
pub use router::create_router;
pub use server::ChatServer;
pub use ws::Keepalive;
