//! # Relay Hub Module
//!
//! The WebSocket broker that pairs scanner and POS devices. Clients join a
//! named channel; every envelope published on the channel is broadcast to
//! all OTHER members.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Hub Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      RelayHub (Axum)                            │   │
//! │  │                                                                 │   │
//! │  │  /ws endpoint ──▶ WebSocket upgrade                            │   │
//! │  │                        │                                        │   │
//! │  │                        ▼                                        │   │
//! │  │              Join {channel, senderId}  (10s deadline)           │   │
//! │  │                        │                                        │   │
//! │  │         ┌──────────────┼──────────────┐                        │   │
//! │  │         ▼              ▼              ▼                        │   │
//! │  │  ┌────────────┐ ┌────────────┐ ┌────────────┐                  │   │
//! │  │  │pos-scanner-│ │pos-scanner-│ │pos-scanner-│   One broadcast  │   │
//! │  │  │   shop1    │ │   shop2    │ │   kiosk    │   channel each   │   │
//! │  │  └────────────┘ └────────────┘ └────────────┘                  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Message Flow:                                                          │
//! │  ─────────────                                                          │
//! │  1. Client connects and sends Join within 10 seconds                   │
//! │  2. Hub responds with Joined (includes server time)                    │
//! │  3. Client sends Event envelopes                                       │
//! │  4. Hub broadcasts each envelope to every other channel member         │
//! │  5. Hub sends periodic Ping to maintain connections                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::protocol::{Envelope, JoinPayload, RelayMessage};

// =============================================================================
// Constants
// =============================================================================

/// Default hub port when run standalone.
pub const DEFAULT_HUB_PORT: u16 = 8000;

/// How long a client may take to send Join after connecting.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Per-channel broadcast capacity.
const CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Hub Configuration
// =============================================================================

/// Configuration for a standalone hub server.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address (default: 0.0.0.0).
    pub bind_addr: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            port: DEFAULT_HUB_PORT,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

impl HubConfig {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Hub State
// =============================================================================

/// Shared broker state: one broadcast channel per named relay channel.
pub struct HubState {
    channels: RwLock<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl HubState {
    /// Creates empty hub state.
    pub fn new() -> Arc<Self> {
        Arc::new(HubState {
            channels: RwLock::new(HashMap::new()),
        })
    }

    /// Subscribes to a channel, creating it on first join.
    async fn join(&self, channel: &str) -> broadcast::Receiver<Envelope> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes an envelope to its channel. Lossy when no one listens.
    async fn publish(&self, envelope: Envelope) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&envelope.channel) {
            let _ = tx.send(envelope);
        }
    }

    /// Drops a channel once its last member leaves.
    async fn leave(&self, channel: &str) {
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(channel) {
            if tx.receiver_count() == 0 {
                channels.remove(channel);
                debug!(channel = %channel, "Channel removed, last member left");
            }
        }
    }

    /// Number of active named channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

/// Builds the hub router (`/ws` + `/health`) over shared state.
///
/// The POS server merges this into its page router; [`RelayHub::start`]
/// serves it standalone.
pub fn hub_router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// =============================================================================
// Hub Server
// =============================================================================

/// A standalone relay hub server.
pub struct RelayHub {
    config: HubConfig,
    state: Arc<HubState>,
}

/// Handle for controlling a running hub.
#[derive(Clone)]
pub struct HubHandle {
    state: Arc<HubState>,
    shutdown_tx: mpsc::Sender<()>,
}

impl HubHandle {
    /// Number of active named channels.
    pub async fn channel_count(&self) -> usize {
        self.state.channel_count().await
    }

    /// Shuts down the hub server.
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| RelayError::ChannelClosed("Hub shutdown channel closed".into()))
    }
}

impl RelayHub {
    /// Creates a hub with fresh state.
    pub fn new(config: HubConfig) -> Self {
        RelayHub {
            config,
            state: HubState::new(),
        }
    }

    /// Starts the hub and returns a handle plus the actual bound address
    /// (useful when the config requested port 0).
    pub async fn start(self) -> RelayResult<(HubHandle, std::net::SocketAddr)> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = HubHandle {
            state: self.state.clone(),
            shutdown_tx,
        };

        let app = hub_router(self.state);

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| RelayError::Connect(format!("Failed to bind to {bind_addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::Connect(e.to_string()))?;

        info!(addr = %local_addr, "Relay hub started");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                    info!("Relay hub shutting down");
                })
                .await
                .ok();
        });

        Ok((handle, local_addr))
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<HubState>>) -> impl IntoResponse {
    debug!("New WebSocket connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one client connection end to end.
async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let (mut sender, mut receiver) = socket.split();

    // Join handshake, bounded by the deadline.
    let join = match receive_join(&mut receiver).await {
        Ok(join) => join,
        Err(e) => {
            warn!(error = %e, "Join handshake failed - closing connection");
            let reject = RelayMessage::error("JOIN_REQUIRED", e.to_string());
            if let Ok(json) = reject.to_json() {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            return;
        }
    };

    let channel = join.channel.clone();
    let sender_id = join.sender_id.clone();

    info!(channel = %channel, sender_id = %sender_id, "Client joined");

    let mut channel_rx = state.join(&channel).await;

    // Acknowledge the join.
    let joined = RelayMessage::joined(channel.clone());
    match joined.to_json() {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                state.leave(&channel).await;
                return;
            }
        }
        Err(_) => return,
    }

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Broadcast forwarding task, excluding this client's own envelopes
    let forward_sender_id = sender_id.clone();
    let forward_channel = channel.clone();
    let outgoing_tx_clone = outgoing_tx.clone();
    let forward_handle = tokio::spawn(async move {
        loop {
            match channel_rx.recv().await {
                Ok(envelope) => {
                    if envelope.sender_id == forward_sender_id {
                        continue;
                    }
                    let msg = RelayMessage::Event(envelope);
                    if let Ok(json) = msg.to_json() {
                        if outgoing_tx_clone.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        channel = %forward_channel,
                        sender_id = %forward_sender_id,
                        skipped,
                        "Broadcast receiver lagged"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        ping_interval.tick().await;
        loop {
            ping_interval.tick().await;
            let Ok(json) = RelayMessage::Ping.to_json() else {
                break;
            };
            if outgoing_tx_ping.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match RelayMessage::from_json(&text) {
                Ok(msg) => handle_client_message(&state, &channel, &sender_id, msg, &outgoing_tx).await,
                Err(e) => {
                    debug!(sender_id = %sender_id, error = %e, "Invalid message format");
                }
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Pong(_))) => {
                // Connection is alive
            }
            Some(Ok(Message::Close(_))) => {
                info!(sender_id = %sender_id, "Client requested close");
                break;
            }
            Some(Ok(_)) => {
                // Binary frames are not part of the protocol.
            }
            Some(Err(e)) => {
                warn!(sender_id = %sender_id, error = %e, "WebSocket error");
                break;
            }
            None => {
                info!(sender_id = %sender_id, "Client disconnected");
                break;
            }
        }
    }

    // Cleanup
    ping_handle.abort();
    forward_handle.abort();
    outgoing_handle.abort();
    state.leave(&channel).await;
}

/// Waits for the Join message, bounded by [`JOIN_TIMEOUT`].
async fn receive_join(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
) -> RelayResult<JoinPayload> {
    let timeout = tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await;

    match timeout {
        Ok(Some(Ok(msg))) => {
            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Binary(b) => String::from_utf8_lossy(&b).to_string(),
                _ => return Err(RelayError::Protocol("Expected text message".into())),
            };

            let relay_msg = RelayMessage::from_json(&text)
                .map_err(|e| RelayError::Protocol(format!("Invalid JSON: {e}")))?;

            match relay_msg {
                RelayMessage::Join(payload) if payload.channel.trim().is_empty() => {
                    Err(RelayError::Handshake("Empty channel name".into()))
                }
                RelayMessage::Join(payload) => Ok(payload),
                other => Err(RelayError::Handshake(format!(
                    "Expected Join, got {}",
                    other.type_name()
                ))),
            }
        }
        Ok(Some(Err(e))) => Err(RelayError::Connect(format!("WebSocket error: {e}"))),
        Ok(None) => Err(RelayError::Connect("Connection closed".into())),
        Err(_) => Err(RelayError::Handshake("Join timeout".into())),
    }
}

/// Handles one post-handshake message.
async fn handle_client_message(
    state: &HubState,
    channel: &str,
    sender_id: &str,
    msg: RelayMessage,
    outgoing_tx: &mpsc::Sender<Message>,
) {
    match msg {
        RelayMessage::Event(mut envelope) => {
            // Route by the joined channel and stamp the authenticated
            // sender id; clients cannot publish on behalf of others.
            envelope.channel = channel.to_string();
            envelope.sender_id = sender_id.to_string();
            debug!(
                channel = %channel,
                sender_id = %sender_id,
                event = envelope.event.type_name(),
                "Relaying event"
            );
            state.publish(envelope).await;
        }
        RelayMessage::Ping => {
            if let Ok(json) = RelayMessage::Pong.to_json() {
                let _ = outgoing_tx.send(Message::Text(json.into())).await;
            }
        }
        RelayMessage::Pong => {
            // Keepalive answered.
        }
        other => {
            debug!(
                sender_id = %sender_id,
                msg_type = other.type_name(),
                "Ignoring unexpected message"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, RelayChannel, RelayLink};
    use crate::protocol::RelayEvent;
    use beacon_core::Quantity;

    #[test]
    fn test_hub_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.port, DEFAULT_HUB_PORT);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_hub_config_bind_address() {
        let config = HubConfig {
            port: 9000,
            bind_addr: "127.0.0.1".to_string(),
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    async fn start_test_hub() -> (HubHandle, String) {
        let hub = RelayHub::new(HubConfig {
            port: 0,
            bind_addr: "127.0.0.1".to_string(),
        });
        let (handle, addr) = hub.start().await.unwrap();
        (handle, format!("ws://{addr}/ws"))
    }

    async fn connect(url: &str, identifier: &str, sender_id: &str) -> (RelayChannel, mpsc::Receiver<RelayEvent>) {
        let config = ChannelConfig::new(url, identifier, sender_id);
        let (channel, events) = RelayChannel::spawn(config);
        // Wait for connect + Join ack.
        for _ in 0..100 {
            if channel.is_connected().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        // Give the Join/Joined exchange a moment to settle.
        tokio::time::sleep(Duration::from_millis(400)).await;
        (channel, events)
    }

    #[tokio::test]
    async fn test_event_relays_between_channel_members() {
        let (_hub, url) = start_test_hub().await;

        let (scanner, mut scanner_events) = connect(&url, "shop1", "scanner-a").await;
        let (pos, mut pos_events) = connect(&url, "shop1", "pos-a").await;

        scanner
            .publish(RelayEvent::barcode_scanned(
                "1001",
                Some("Rice".into()),
                Quantity::one(),
            ))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), pos_events.recv())
            .await
            .expect("timed out waiting for relayed event")
            .expect("event stream closed");

        match received {
            RelayEvent::BarcodeScanned(payload) => {
                assert_eq!(payload.barcode, "1001");
                assert_eq!(payload.quantity, Quantity::one());
            }
            other => panic!("expected BarcodeScanned, got {other:?}"),
        }

        // The sender never hears its own event.
        assert!(
            tokio::time::timeout(Duration::from_millis(500), scanner_events.recv())
                .await
                .is_err()
        );

        let _ = scanner.shutdown().await;
        let _ = pos.shutdown().await;
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let (_hub, url) = start_test_hub().await;

        let (shop1, _shop1_events) = connect(&url, "shop1", "scanner-a").await;
        let (_shop2, mut shop2_events) = connect(&url, "shop2", "pos-b").await;

        shop1
            .publish(RelayEvent::open_add_product("9001"))
            .await
            .unwrap();

        // A member of another channel never sees the event.
        assert!(
            tokio::time::timeout(Duration::from_millis(700), shop2_events.recv())
                .await
                .is_err()
        );
    }
}
