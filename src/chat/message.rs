//! Envelope types exchanged over the chat channel.
//!
//! Both directions use flat JSON objects discriminated by a `type` field.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
///
/// Fields the server does not use (the browser client attaches its own
/// `timestamp`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim or change the display name.
    Join {
        /// Requested display name.
        #[serde(default)]
        username: String,
    },
    /// Send a chat message.
    Chat {
        /// Message text.
        #[serde(default)]
        message: String,
    },
    /// Application-level keepalive.
    Ping,
}

impl ClientMessage {
    /// Parse an inbound payload.
    ///
    /// Returns `None` for anything that is not a recognised envelope.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed client message");
                None
            }
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// System notice (welcome, joined, left).
    System {
        /// Notice text.
        message: String,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Error addressed to a single sender.
    Error {
        /// Error text.
        message: String,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Confirmation of a successful name claim.
    JoinSuccess {
        /// The claimed name.
        username: String,
        /// Confirmation text.
        message: String,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Reply to a client ping.
    Pong {
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Current number of users.
    UserCount {
        /// User count.
        count: usize,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Current list of named users.
    UserList {
        /// Display names in claim order.
        users: Vec<String>,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Chat message relayed to everyone.
    Chat {
        /// Sender's display name.
        username: String,
        /// Message text.
        message: String,
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
}

/// Current server time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl ServerMessage {
    /// Create a system notice.
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Create an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Notice broadcast when a connection claims its first name.
    pub fn joined(username: &str) -> Self {
        Self::system(format!("{username} has joined the chat"))
    }

    /// Notice broadcast when a named connection goes away.
    pub fn left(username: &str) -> Self {
        Self::system(format!("{username} has left the chat"))
    }

    /// Error sent when the requested name is held by someone else.
    pub fn name_taken(username: &str) -> Self {
        Self::error(format!(
            "Username '{username}' is already taken. Please choose another."
        ))
    }

    /// Confirmation sent to the connection that claimed a name.
    pub fn join_success(username: impl Into<String>) -> Self {
        let username = username.into();
        Self::JoinSuccess {
            message: format!("You are now chatting as {username}"),
            username,
            timestamp: now_timestamp(),
        }
    }

    /// Create a pong reply.
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: now_timestamp(),
        }
    }

    /// Create a user count notification.
    pub fn user_count(count: usize) -> Self {
        Self::UserCount {
            count,
            timestamp: now_timestamp(),
        }
    }

    /// Create a user list notification.
    pub fn user_list(users: Vec<String>) -> Self {
        Self::UserList {
            users,
            timestamp: now_timestamp(),
        }
    }

    /// Create a chat message.
    pub fn chat(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chat {
            username: username.into(),
            message: message.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Wire name of this message's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Error { .. } => "error",
            Self::JoinSuccess { .. } => "join_success",
            Self::Pong { .. } => "pong",
            Self::UserCount { .. } => "user_count",
            Self::UserList { .. } => "user_list",
            Self::Chat { .. } => "chat",
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
