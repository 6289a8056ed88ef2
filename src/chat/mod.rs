//! Chat module.
//!
//! This module provides the chat relay core:
//! - Envelope types for inbound and outbound messages
//! - The connection registry with broadcast fan-out

mod message;
mod registry;

pub use message::{now_timestamp, ClientMessage, ServerMessage};
pub use registry::{ChatRegistry, ClaimOutcome, ConnectionId, Outbox};
