//! chatrelay - minimal real-time chat relay
//!
//! Clients connect over a WebSocket, claim a display name, and exchange
//! short text messages broadcast to every connected participant.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use chat::{ChatRegistry, ClaimOutcome, ClientMessage, ConnectionId, ServerMessage};
pub use config::{Config, UserCountMode};
pub use error::{RelayError, Result};
pub use web::ChatServer;
