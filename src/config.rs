//! Configuration module for the chat relay.

use serde::Deserialize;
use std::path::Path;

use crate::{RelayError, Result};

/// Environment variable that overrides the listening port.
pub const PORT_ENV: &str = "PORT";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// How the `user_count` notification counts connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserCountMode {
    /// Every open connection, named or anonymous.
    #[default]
    All,
    /// Only connections that have claimed a display name.
    Named,
}

/// Chat behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Notice sent to each connection right after it is accepted.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    /// Definition of the broadcast user count.
    #[serde(default)]
    pub user_count: UserCountMode,
    /// Interval between transport-level pings in seconds.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    /// Time to wait for a pong before closing the connection, in seconds.
    #[serde(default = "default_keepalive_timeout")]
    pub keepalive_timeout_secs: u64,
}

fn default_welcome_message() -> String {
    "Welcome to the chat! Please enter your username to begin.".to_string()
}

fn default_keepalive_interval() -> u64 {
    30
}

fn default_keepalive_timeout() -> u64 {
    10
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            welcome_message: default_welcome_message(),
            user_count: UserCountMode::default(),
            keepalive_interval_secs: default_keepalive_interval(),
            keepalive_timeout_secs: default_keepalive_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file, written alongside stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RelayError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RelayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: Override the listening port
    pub fn apply_env_overrides(&mut self) {
        self.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());
    }

    fn apply_port_override(&mut self, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        match value.parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(_) => {
                tracing::warn!(value, "Ignoring non-numeric {} override", PORT_ENV);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The keepalive timeout is zero
    /// - The keepalive timeout is not shorter than the keepalive interval
    pub fn validate(&self) -> Result<()> {
        let chat = &self.chat;
        if chat.keepalive_timeout_secs == 0 {
            return Err(RelayError::Validation(
                "keepalive_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if chat.keepalive_timeout_secs >= chat.keepalive_interval_secs {
            return Err(RelayError::Validation(format!(
                "keepalive_timeout_secs ({}) must be shorter than keepalive_interval_secs ({})",
                chat.keepalive_timeout_secs, chat.keepalive_interval_secs
            )));
        }
        Ok(())
    }
}
