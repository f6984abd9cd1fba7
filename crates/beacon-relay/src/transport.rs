//! # WebSocket Transport Module
//!
//! Maintains a persistent WebSocket connection to the relay hub with
//! automatic reconnection, exponential backoff and a bounded attempt
//! budget.
//!
//! ## Connection State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transport State Machine                             │
//! │                                                                         │
//! │   ┌──────────────┐  connect()   ┌──────────────┐   success             │
//! │   │ Disconnected │─────────────▶│  Connecting  │──────────┐            │
//! │   └──────────────┘              └──────┬───────┘          │            │
//! │          ▲                             │ failure          ▼            │
//! │          │                             ▼           ┌──────────────┐    │
//! │          │ shutdown              ┌──────────────┐  │  Connected   │    │
//! │          └───────────────────────│   Backoff    │  └──────┬───────┘    │
//! │                                  └──────┬───────┘         │ conn lost  │
//! │                                         │ delay           │            │
//! │                                         ▼                 │            │
//! │                                  ┌──────────────┐         │            │
//! │                                  │ Reconnecting │◀────────┘            │
//! │                                  └──────┬───────┘                      │
//! │                                         │ attempts exhausted           │
//! │                                         ▼                              │
//! │                                  ┌──────────────┐                      │
//! │                                  │   GaveUp     │  terminal; surfaced  │
//! │                                  └──────────────┘  to the session      │
//! │                                                                         │
//! │  BACKOFF: 500ms initial, doubling, 60s cap, 10 attempts by default.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::protocol::RelayMessage;

// =============================================================================
// Configuration
// =============================================================================

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hub WebSocket URL, e.g. "ws://hub.local:8000/ws".
    pub url: String,
    /// Timeout for each connection attempt.
    pub connect_timeout: Duration,
    /// Initial backoff delay after a failure.
    pub initial_backoff: Duration,
    /// Backoff delay ceiling.
    pub max_backoff: Duration,
    /// Connection attempts before giving up. 0 means retry forever.
    pub max_retries: u32,
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
}

/// Default connection attempt budget.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            max_retries: DEFAULT_MAX_RETRIES,
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Creates a config for the given hub URL with default timing.
    pub fn for_url(url: impl Into<String>) -> Self {
        TransportConfig {
            url: url.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Observable state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying.
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Connection established; Join handshake is the session's job.
    Connected,
    /// Waiting out a backoff delay.
    Backoff,
    /// Retrying after a lost connection.
    Reconnecting,
    /// Attempt budget exhausted. Terminal until an explicit restart.
    GaveUp,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::GaveUp => write!(f, "gave_up"),
        }
    }
}

// =============================================================================
// Transport Handle
// =============================================================================

/// Cloneable handle for interacting with a running transport.
#[derive(Clone)]
pub struct TransportHandle {
    outgoing_tx: mpsc::Sender<RelayMessage>,
    state: Arc<RwLock<ConnectionState>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl TransportHandle {
    /// Queues a message for sending. Fails if the transport task is gone.
    pub async fn send(&self, msg: RelayMessage) -> RelayResult<()> {
        self.outgoing_tx
            .send(msg)
            .await
            .map_err(|_| RelayError::ChannelClosed("Transport outgoing channel closed".into()))
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Whether the socket is currently up.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Whether the transport has exhausted its attempt budget.
    pub async fn gave_up(&self) -> bool {
        *self.state.read().await == ConnectionState::GaveUp
    }

    /// Signals the transport task to stop.
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| RelayError::ChannelClosed("Transport shutdown channel closed".into()))
    }
}

// =============================================================================
// Transport
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The WebSocket client transport.
pub struct Transport {
    config: TransportConfig,
    state: Arc<RwLock<ConnectionState>>,
    outgoing_rx: mpsc::Receiver<RelayMessage>,
    incoming_tx: mpsc::Sender<RelayMessage>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Transport {
    /// Spawns the transport task.
    ///
    /// Returns a handle for sending/observing and a receiver carrying every
    /// inbound message. Protocol `Ping`s are answered internally and never
    /// reach the receiver.
    pub fn spawn(config: TransportConfig) -> (TransportHandle, mpsc::Receiver<RelayMessage>) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(100);
        let (incoming_tx, incoming_rx) = mpsc::channel(100);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));

        let handle = TransportHandle {
            outgoing_tx,
            state: state.clone(),
            shutdown_tx,
        };

        let transport = Transport {
            config,
            state,
            outgoing_rx,
            incoming_tx,
            shutdown_rx,
        };

        tokio::spawn(transport.run());

        (handle, incoming_rx)
    }

    /// Main connect/reconnect loop.
    async fn run(mut self) {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        };
        let mut attempts: u32 = 0;
        let mut ever_connected = false;

        loop {
            // A shutdown signal queued during backoff wins over reconnecting.
            if self.shutdown_rx.try_recv().is_ok() {
                info!("Transport shutting down");
                self.set_state(ConnectionState::Disconnected).await;
                return;
            }

            self.set_state(if ever_connected {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Connecting
            })
            .await;

            attempts += 1;
            match self.connect_with_timeout().await {
                Ok(stream) => {
                    info!(url = %self.config.url, "Transport connected");
                    self.set_state(ConnectionState::Connected).await;
                    ever_connected = true;
                    attempts = 0;
                    backoff.reset();

                    if self.connection_loop(stream).await {
                        // Clean shutdown requested.
                        self.set_state(ConnectionState::Disconnected).await;
                        return;
                    }
                    warn!(url = %self.config.url, "Connection lost, will reconnect");
                }
                Err(err) => {
                    warn!(
                        url = %self.config.url,
                        attempts,
                        error = %err,
                        "Connection attempt failed"
                    );
                }
            }

            if self.config.max_retries > 0 && attempts >= self.config.max_retries {
                error!(
                    url = %self.config.url,
                    attempts,
                    "Attempt budget exhausted, giving up"
                );
                self.set_state(ConnectionState::GaveUp).await;
                return;
            }

            self.set_state(ConnectionState::Backoff).await;
            let delay = backoff.next_backoff().unwrap_or(self.config.max_backoff);
            debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown_rx.recv() => {
                    info!("Transport shutting down during backoff");
                    self.set_state(ConnectionState::Disconnected).await;
                    return;
                }
            }
        }
    }

    /// One connection attempt, bounded by the configured timeout.
    async fn connect_with_timeout(&self) -> RelayResult<WsStream> {
        let connect = connect_async(self.config.url.as_str());
        match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(RelayError::Connect(format!(
                "timed out after {:?}",
                self.config.connect_timeout
            ))),
        }
    }

    /// Pumps one live connection. Returns true when shutdown was requested,
    /// false when the connection dropped and a reconnect should follow.
    async fn connection_loop(&mut self, stream: WsStream) -> bool {
        let (mut write, mut read) = stream.split();
        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it.
        ping_interval.tick().await;

        loop {
            tokio::select! {
                outgoing = self.outgoing_rx.recv() => {
                    let Some(msg) = outgoing else {
                        // All handles dropped; treat as shutdown.
                        return true;
                    };
                    match msg.to_json() {
                        Ok(json) => {
                            if let Err(err) = write.send(Message::Text(json.into())).await {
                                warn!(error = %err, "Send failed");
                                return false;
                            }
                        }
                        Err(err) => {
                            error!(error = %err, msg_type = msg.type_name(), "Failed to encode message");
                        }
                    }
                }

                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match RelayMessage::from_json(&text) {
                                Ok(RelayMessage::Ping) => {
                                    if let Ok(json) = RelayMessage::Pong.to_json() {
                                        let _ = write.send(Message::Text(json.into())).await;
                                    }
                                }
                                Ok(msg) => {
                                    debug!(msg_type = msg.type_name(), "Received message");
                                    if self.incoming_tx.send(msg).await.is_err() {
                                        // Consumer gone; nothing left to do.
                                        return true;
                                    }
                                }
                                Err(err) => {
                                    debug!(error = %err, "Ignoring unparseable message");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            // Keepalive answered.
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Server closed the connection");
                            return false;
                        }
                        Some(Ok(_)) => {
                            // Binary/raw frames are not part of the protocol.
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "WebSocket read error");
                            return false;
                        }
                        None => {
                            info!("Connection stream ended");
                            return false;
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    if let Ok(json) = RelayMessage::Ping.to_json() {
                        if write.send(Message::Text(json.into())).await.is_err() {
                            return false;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Transport shutdown requested");
                    let _ = write.send(Message::Close(None)).await;
                    return true;
                }
            }
        }
    }

    async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        if *state != new_state {
            debug!(from = %*state, to = %new_state, "Transport state change");
            *state = new_state;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_bounded() {
        let config = TransportConfig::default();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::GaveUp.to_string(), "gave_up");
    }

    #[tokio::test]
    async fn test_unreachable_hub_gives_up_after_budget() {
        // Nothing listens on this port; every attempt fails fast.
        let mut config = TransportConfig::for_url("ws://127.0.0.1:1/ws");
        config.max_retries = 2;
        config.initial_backoff = Duration::from_millis(10);
        config.max_backoff = Duration::from_millis(20);

        let (handle, _incoming) = Transport::spawn(config);

        // Poll until the budget is spent.
        for _ in 0..200 {
            if handle.gave_up().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("transport never reached GaveUp");
    }

    #[tokio::test]
    async fn test_send_after_task_exit_is_channel_closed() {
        let mut config = TransportConfig::for_url("ws://127.0.0.1:1/ws");
        config.max_retries = 1;
        config.initial_backoff = Duration::from_millis(1);

        let (handle, incoming) = Transport::spawn(config);
        drop(incoming);

        // Wait for the task to give up and drop its receiver.
        for _ in 0..100 {
            if handle.gave_up().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let err = handle.send(RelayMessage::Ping).await.unwrap_err();
        assert!(matches!(err, RelayError::ChannelClosed(_)));
    }
}
