//! Test helpers for E2E tests.
//!
//! Provides TestServer and TestClient for driving the chat over real sockets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chatrelay::web::Keepalive;
use chatrelay::{ChatRegistry, ChatServer, Config, UserCountMode};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding that nothing else is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// A chat server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<ChatRegistry>,
}

impl TestServer {
    /// Start a server with default chat settings.
    pub async fn new() -> Self {
        Self::with_config(test_config(), None).await
    }

    /// Start a server using the given user count definition.
    pub async fn with_user_count(mode: UserCountMode) -> Self {
        let mut config = test_config();
        config.chat.user_count = mode;
        Self::with_config(config, None).await
    }

    /// Start a server with custom keepalive timing.
    pub async fn with_keepalive(keepalive: Keepalive) -> Self {
        Self::with_config(test_config(), Some(keepalive)).await
    }

    async fn with_config(config: Config, keepalive: Option<Keepalive>) -> Self {
        let mut server = ChatServer::new(&config);
        if let Some(keepalive) = keepalive {
            server = server.with_keepalive(keepalive);
        }
        let registry = server.registry();
        let addr = server.run_with_addr().await.expect("Failed to start server");
        Self { addr, registry }
    }

    /// WebSocket URL for the chat endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect a new client and consume its welcome and user count notices.
    pub async fn connect(&self) -> TestClient {
        let mut client = TestClient::connect(&self.ws_url()).await;
        let welcome = client.recv().await;
        assert_eq!(welcome["type"], "system");
        client.recv_type("user_count").await;
        client
    }

    /// Connect `n` clients, consuming every user count notice their arrival
    /// produces so that each client starts with an empty queue.
    pub async fn connect_all(&self, n: usize) -> Vec<TestClient> {
        let mut clients: Vec<TestClient> = Vec::with_capacity(n);
        for _ in 0..n {
            let client = self.connect().await;
            for earlier in clients.iter_mut() {
                earlier.recv_type("user_count").await;
            }
            clients.push(client);
        }
        clients
    }

    /// Wait until the registry holds `expected` connections.
    pub async fn wait_for_connections(&self, expected: usize) {
        let registry = Arc::clone(&self.registry);
        timeout(DEFAULT_TIMEOUT, async move {
            while registry.connection_count().await != expected {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("Timed out waiting for connection count");
    }
}

/// Build a configuration bound to localhost on an ephemeral port.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config
}

/// Test client speaking the chat envelope protocol.
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to the given WebSocket URL.
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url).await.expect("Failed to connect");
        Self { stream }
    }

    /// Send a raw text frame.
    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("Failed to send");
    }

    /// Send a raw binary frame.
    pub async fn send_binary(&mut self, data: &[u8]) {
        self.stream
            .send(Message::binary(data.to_vec()))
            .await
            .expect("Failed to send");
    }

    /// Send a JSON envelope.
    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Send a join request.
    pub async fn join(&mut self, username: &str) {
        self.send_json(json!({ "type": "join", "username": username }))
            .await;
    }

    /// Send a chat message.
    pub async fn chat(&mut self, message: &str) {
        self.send_json(json!({ "type": "chat", "message": message }))
            .await;
    }

    /// Send an application-level ping.
    pub async fn ping(&mut self) {
        self.send_json(json!({ "type": "ping" })).await;
    }

    /// Receive the next envelope, or `None` if nothing arrives in `duration`.
    pub async fn try_recv(&mut self, duration: Duration) -> Option<Value> {
        loop {
            let frame = timeout(duration, self.stream.next()).await.ok()??.ok()?;
            let text = match &frame {
                Message::Text(_) | Message::Binary(_) => frame.to_text().ok()?.to_string(),
                Message::Close(_) => return None,
                // Transport keepalive is not part of the envelope protocol.
                _ => continue,
            };
            return Some(serde_json::from_str(&text).expect("Server sent invalid JSON"));
        }
    }

    /// Receive the next envelope, failing the test on timeout.
    pub async fn recv(&mut self) -> Value {
        self.try_recv(DEFAULT_TIMEOUT)
            .await
            .expect("Timed out waiting for message")
    }

    /// Receive envelopes until one of the given type arrives.
    pub async fn recv_type(&mut self, kind: &str) -> Value {
        loop {
            let msg = self.recv().await;
            if msg["type"] == kind {
                return msg;
            }
        }
    }

    /// Assert that no envelope arrives within the quiet period.
    pub async fn expect_silence(&mut self) {
        if let Some(msg) = self.try_recv(QUIET_PERIOD).await {
            panic!("Expected no message, got {msg}");
        }
    }

    /// Send a close frame.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
