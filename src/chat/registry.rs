//! Connection registry and broadcaster.
//!
//! The registry owns every live connection's outbound queue together with
//! its optional display name. All mutations and every broadcast snapshot go
//! through the same lock, so a broadcast always sees a consistent set of
//! recipients and names.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::message::{ClientMessage, ServerMessage};
use crate::config::UserCountMode;

/// Sending half of a connection's outbound queue.
///
/// The receiving half is owned by that connection's writer task.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Opaque connection identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of a name claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Empty name or unknown connection; nothing happened.
    Ignored,
    /// Another connection already holds the name.
    Taken,
    /// First name for this connection.
    Joined,
    /// The connection already had a name and now holds the new one.
    Renamed {
        /// Name held before the claim.
        previous: String,
    },
}

/// Registry entry for one live connection.
struct Connection {
    display_name: Option<String>,
    /// Position in the user list; assigned on first claim, kept across renames.
    claim_seq: Option<u64>,
    outbox: Outbox,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    next_claim_seq: u64,
}

impl RegistryState {
    /// Deliver `message` to every registered connection.
    ///
    /// Each delivery is independent; a closed outbox is skipped and the
    /// connection is left for its own disconnect path to reap.
    fn broadcast(&self, message: ServerMessage) {
        let mut failed = 0usize;
        for connection in self.connections.values() {
            if connection.outbox.send(message.clone()).is_err() {
                failed += 1;
            }
        }
        if failed > 0 {
            tracing::trace!(kind = message.kind(), failed, "Broadcast skipped closed outboxes");
        }
    }

    fn send_to(&self, id: ConnectionId, message: ServerMessage) -> bool {
        match self.connections.get(&id) {
            Some(connection) => connection.outbox.send(message).is_ok(),
            None => false,
        }
    }

    fn name_held_by_other(&self, id: ConnectionId, name: &str) -> bool {
        self.connections
            .iter()
            .any(|(other, c)| *other != id && c.display_name.as_deref() == Some(name))
    }

    fn user_count(&self, mode: UserCountMode) -> usize {
        match mode {
            UserCountMode::All => self.connections.len(),
            UserCountMode::Named => self
                .connections
                .values()
                .filter(|c| c.display_name.is_some())
                .count(),
        }
    }

    fn user_list(&self) -> Vec<String> {
        let mut named: Vec<(u64, &str)> = self
            .connections
            .values()
            .filter_map(|c| Some((c.claim_seq?, c.display_name.as_deref()?)))
            .collect();
        named.sort_unstable_by_key(|(seq, _)| *seq);
        named.into_iter().map(|(_, name)| name.to_string()).collect()
    }

    fn broadcast_user_count(&self, mode: UserCountMode) {
        self.broadcast(ServerMessage::user_count(self.user_count(mode)));
    }

    fn broadcast_user_list(&self) {
        self.broadcast(ServerMessage::user_list(self.user_list()));
    }
}

/// Process-wide registry of open chat connections.
///
/// This is shared across all connection tasks behind an `Arc`.
pub struct ChatRegistry {
    state: RwLock<RegistryState>,
    user_count_mode: UserCountMode,
    welcome_message: String,
}

impl ChatRegistry {
    /// Create an empty registry.
    pub fn new(user_count_mode: UserCountMode, welcome_message: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            user_count_mode,
            welcome_message: welcome_message.into(),
        }
    }

    /// Create a registry from the chat configuration.
    pub fn from_config(config: &crate::config::ChatConfig) -> Self {
        Self::new(config.user_count, config.welcome_message.clone())
    }

    /// Register a newly accepted connection.
    ///
    /// The connection receives the welcome notice, then everyone (the new
    /// connection included) receives the updated user count.
    pub async fn accept(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::new();
        let mut state = self.state.write().await;

        state.connections.insert(
            id,
            Connection {
                display_name: None,
                claim_seq: None,
                outbox,
            },
        );
        state.send_to(id, ServerMessage::system(&self.welcome_message));
        state.broadcast_user_count(self.user_count_mode);

        tracing::debug!(connection_id = %id, connections = state.connections.len(), "Connection accepted");
        id
    }

    /// Claim a display name for a connection.
    pub async fn claim_name(&self, id: ConnectionId, requested: &str) -> ClaimOutcome {
        let name = requested.trim();
        if name.is_empty() {
            return ClaimOutcome::Ignored;
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if !state.connections.contains_key(&id) {
            return ClaimOutcome::Ignored;
        }

        if state.name_held_by_other(id, name) {
            tracing::debug!(connection_id = %id, name, "Name already taken");
            state.send_to(id, ServerMessage::name_taken(name));
            return ClaimOutcome::Taken;
        }

        let Some(connection) = state.connections.get_mut(&id) else {
            return ClaimOutcome::Ignored;
        };
        let previous = connection.display_name.replace(name.to_string());
        if connection.claim_seq.is_none() {
            connection.claim_seq = Some(state.next_claim_seq);
            state.next_claim_seq += 1;
        }

        state.send_to(id, ServerMessage::join_success(name));

        let outcome = match previous {
            None => {
                state.broadcast(ServerMessage::joined(name));
                ClaimOutcome::Joined
            }
            Some(previous) => ClaimOutcome::Renamed { previous },
        };
        state.broadcast_user_list();

        tracing::debug!(connection_id = %id, name, outcome = ?outcome, "Name claimed");
        outcome
    }

    /// Relay a chat message from a named connection to everyone.
    ///
    /// Returns `false` when the message was dropped: empty text, or a
    /// sender that has not claimed a name.
    pub async fn chat(&self, id: ConnectionId, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let state = self.state.read().await;
        let Some(username) = state
            .connections
            .get(&id)
            .and_then(|c| c.display_name.clone())
        else {
            return false;
        };

        state.broadcast(ServerMessage::chat(username, text));
        true
    }

    /// Answer an application-level ping with a pong to the sender only.
    pub async fn ping(&self, id: ConnectionId) -> bool {
        self.state.read().await.send_to(id, ServerMessage::pong())
    }

    /// Dispatch a parsed client message.
    pub async fn handle(&self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Join { username } => {
                self.claim_name(id, &username).await;
            }
            ClientMessage::Chat { message } => {
                self.chat(id, &message).await;
            }
            ClientMessage::Ping => {
                self.ping(id).await;
            }
        }
    }

    /// Parse and dispatch a raw inbound payload. Malformed input is dropped.
    pub async fn handle_text(&self, id: ConnectionId, raw: &str) {
        if let Some(message) = ClientMessage::parse(raw) {
            self.handle(id, message).await;
        }
    }

    /// Remove a connection whose channel has closed.
    ///
    /// Remaining connections receive a leave notice (if the connection had a
    /// name), then the updated user count and user list. Returns `false` if
    /// the connection was already removed.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        let Some(connection) = state.connections.remove(&id) else {
            return false;
        };

        if let Some(name) = connection.display_name.as_deref() {
            state.broadcast(ServerMessage::left(name));
        }
        state.broadcast_user_count(self.user_count_mode);
        state.broadcast_user_list();

        tracing::debug!(
            connection_id = %id,
            name = connection.display_name.as_deref().unwrap_or(""),
            connections = state.connections.len(),
            "Connection removed"
        );
        true
    }

    /// Number of open connections, named or not.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// User count as broadcast in `user_count` notifications.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.user_count(self.user_count_mode)
    }

    /// Named users in claim order.
    pub async fn user_list(&self) -> Vec<String> {
        self.state.read().await.user_list()
    }

    /// Current display name of a connection.
    pub async fn display_name(&self, id: ConnectionId) -> Option<String> {
        self.state
            .read()
            .await
            .connections
            .get(&id)
            .and_then(|c| c.display_name.clone())
    }

    /// Check whether a connection is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(&id)
    }
}

impl Default for ChatRegistry {
    fn default() -> Self {
        Self::from_config(&crate::config::ChatConfig::default())
    }
}
