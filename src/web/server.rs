//! Chat server: binds the listener and serves the router.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::chat::ChatRegistry;
use crate::config::Config;
use crate::{RelayError, Result};

use super::handlers::AppState;
use super::router::create_router;
use super::ws::Keepalive;

/// WebSocket chat server.
pub struct ChatServer {
    /// Address to bind, as configured.
    bind_addr: String,
    /// Shared connection registry.
    registry: Arc<ChatRegistry>,
    /// Keepalive settings for accepted sockets.
    keepalive: Keepalive,
}

impl ChatServer {
    /// Create a new server from the configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            bind_addr: format!("{}:{}", config.server.host, config.server.port),
            registry: Arc::new(ChatRegistry::from_config(&config.chat)),
            keepalive: Keepalive::from_config(&config.chat),
        }
    }

    /// Override the keepalive settings.
    pub fn with_keepalive(mut self, keepalive: Keepalive) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Get the shared registry.
    pub fn registry(&self) -> Arc<ChatRegistry> {
        Arc::clone(&self.registry)
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.bind_addr.as_str())
            .await
            .map_err(|e| RelayError::bind(&self.bind_addr, e))?;
        let local_addr = listener.local_addr()?;
        Ok((listener, local_addr))
    }

    fn router(&self, local_addr: SocketAddr) -> axum::Router {
        let state = AppState::new(self.registry(), self.keepalive, local_addr.port());
        create_router(Arc::new(state))
    }

    /// Run the server until the process ends.
    pub async fn run(self) -> Result<()> {
        let (listener, local_addr) = self.bind().await?;
        let router = self.router(local_addr);

        tracing::info!("WebSocket chat server listening on ws://{}", local_addr);
        tracing::info!("Health check endpoint: http://{}/health", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, local_addr) = self.bind().await?;
        let router = self.router(local_addr);

        tracing::info!("WebSocket chat server listening on ws://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Chat server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
