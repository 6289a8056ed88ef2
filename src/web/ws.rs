//! Chat WebSocket handler.
//!
//! Each accepted socket runs one reader loop and one writer task. The writer
//! owns the socket sink and drains the connection's outbox, so broadcasts
//! never wait on a slow peer. The reader feeds inbound frames to the
//! registry in order and drives the transport keepalive.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, Instant};

use crate::chat::{ChatRegistry, ServerMessage};
use crate::config::ChatConfig;

use super::AppState;

/// Close code sent when the peer stops answering pings ("going away").
const CLOSE_GOING_AWAY: u16 = 1001;

/// Transport-level keepalive settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    /// Time between pings.
    pub interval: Duration,
    /// Time allowed for the matching pong.
    pub timeout: Duration,
}

impl Keepalive {
    /// Build keepalive settings from the chat configuration.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.keepalive_interval_secs),
            timeout: Duration::from_secs(config.keepalive_timeout_secs),
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// WebSocket chat handler.
///
/// GET / and GET /ws
pub async fn chat_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let registry = Arc::clone(&state.registry);
    let keepalive = state.keepalive;
    ws.on_upgrade(move |socket| handle_socket(socket, registry, keepalive))
}

/// Handle a WebSocket connection from accept to disconnect.
pub async fn handle_socket(socket: WebSocket, registry: Arc<ChatRegistry>, keepalive: Keepalive) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(writer_task(ws_sender, outbox_rx, control_rx));
    let id = registry.accept(outbox).await;
    tracing::info!(connection_id = %id, "WebSocket connection opened");

    let start = Instant::now() + keepalive.interval;
    let mut ping_timer = interval_at(start, keepalive.interval);
    let mut pong_deadline: Option<Instant> = None;

    loop {
        let deadline = pong_deadline;
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    registry.handle_text(id, text.as_str()).await;
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => registry.handle_text(id, text).await,
                    Err(_) => tracing::debug!(connection_id = %id, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Pong(_))) => {
                    pong_deadline = None;
                }
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(connection_id = %id, reason = ?frame, "WebSocket closed by client");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "WebSocket error");
                    break;
                }
                None => {
                    tracing::debug!(connection_id = %id, "WebSocket stream ended");
                    break;
                }
            },

            _ = ping_timer.tick() => {
                if control_tx.send(Message::Ping(Vec::new())).is_err() {
                    // Writer is gone, so the socket is too.
                    break;
                }
                pong_deadline.get_or_insert_with(|| Instant::now() + keepalive.timeout);
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracing::warn!(connection_id = %id, "Pong timeout, closing connection");
                let _ = control_tx.send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "Pong timeout".into(),
                })));
                break;
            }
        }
    }

    registry.disconnect(id).await;
    drop(control_tx);

    // The registry dropped the outbox sender, so the writer drains and exits.
    let mut writer = writer;
    if tokio::time::timeout(keepalive.timeout, &mut writer).await.is_err() {
        tracing::debug!(connection_id = %id, "Writer did not drain in time");
        writer.abort();
    }
    tracing::info!(connection_id = %id, "WebSocket connection closed");
}

/// Forward outbox messages and control frames to the socket.
async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::UnboundedReceiver<ServerMessage>,
    mut control: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let frame = tokio::select! {
            Some(message) = outbox.recv() => match message.to_json() {
                Ok(json) => Message::Text(json.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize server message");
                    continue;
                }
            },
            Some(frame) = control.recv() => frame,
            else => break,
        };

        let closing = matches!(frame, Message::Close(_));
        if sink.send(frame).await.is_err() || closing {
            break;
        }
    }
    let _ = sink.close().await;
}
