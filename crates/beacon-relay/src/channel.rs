//! # Relay Channel
//!
//! One device's membership in a named relay channel. Layers the Join
//! handshake, channel filtering and self-echo suppression on top of the
//! raw [`crate::transport::Transport`], and hands the sessions a clean
//! stream of domain events.
//!
//! ## Responsibilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         RelayChannel                                    │
//! │                                                                         │
//! │  Transport (reconnecting WS)                                           │
//! │       │ RelayMessage                                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ 1. On every (re)connect: send Join {channel, senderId}          │   │
//! │  │ 2. Drop envelopes for other channels                            │   │
//! │  │ 3. Drop envelopes carrying our own sender id (self-echo)        │   │
//! │  │ 4. Forward remaining RelayEvents to the session, FIFO           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ RelayEvent                                                     │
//! │       ▼                                                                 │
//! │  ScannerSession / PosSession                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayResult;
use crate::protocol::{channel_name, RelayEvent, RelayMessage};
use crate::transport::{ConnectionState, Transport, TransportConfig, TransportHandle};

/// How often the channel task re-checks the transport state for a
/// reconnect that needs a fresh Join.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

// =============================================================================
// Relay Link Seam
// =============================================================================

/// What a session needs from the relay: publish and connectivity.
///
/// Sessions depend on this trait, not on the channel, so tests substitute
/// an in-memory fake and never open a socket.
#[async_trait]
pub trait RelayLink: Send + Sync {
    /// Fire-and-forget publish of one event to the paired device.
    async fn publish(&self, event: RelayEvent) -> RelayResult<()>;

    /// Whether the link is currently up.
    async fn is_connected(&self) -> bool;
}

// =============================================================================
// Channel Configuration
// =============================================================================

/// Configuration for joining a relay channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Hub WebSocket URL.
    pub hub_url: String,
    /// User-chosen pairing identifier ("shop1", not the full channel name).
    pub identifier: String,
    /// This device's stable sender id.
    pub sender_id: String,
    /// Transport timing overrides.
    pub transport: TransportConfig,
}

impl ChannelConfig {
    /// Creates a config with default transport timing.
    pub fn new(
        hub_url: impl Into<String>,
        identifier: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        let hub_url = hub_url.into();
        ChannelConfig {
            transport: TransportConfig::for_url(hub_url.clone()),
            hub_url,
            identifier: identifier.into(),
            sender_id: sender_id.into(),
        }
    }
}

// =============================================================================
// Relay Channel
// =============================================================================

/// Handle to a live channel membership.
#[derive(Clone)]
pub struct RelayChannel {
    transport: TransportHandle,
    channel: String,
    sender_id: String,
}

impl RelayChannel {
    /// Connects to the hub and joins the channel.
    ///
    /// Returns the channel handle and the inbound event stream. The
    /// background task keeps the membership alive across reconnects.
    pub fn spawn(config: ChannelConfig) -> (RelayChannel, mpsc::Receiver<RelayEvent>) {
        let channel = channel_name(&config.identifier);
        let sender_id = config.sender_id.clone();

        let mut transport_config = config.transport;
        transport_config.url = config.hub_url;
        let (transport, incoming_rx) = Transport::spawn(transport_config);

        let (event_tx, event_rx) = mpsc::channel(100);

        tokio::spawn(channel_task(
            transport.clone(),
            incoming_rx,
            event_tx,
            channel.clone(),
            sender_id.clone(),
        ));

        (
            RelayChannel {
                transport,
                channel,
                sender_id,
            },
            event_rx,
        )
    }

    /// The full channel name this handle is joined to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current transport state.
    pub async fn state(&self) -> ConnectionState {
        self.transport.state().await
    }

    /// Whether reconnection has been abandoned.
    pub async fn gave_up(&self) -> bool {
        self.transport.gave_up().await
    }

    /// Leaves the channel and closes the connection.
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.transport.shutdown().await
    }
}

#[async_trait]
impl RelayLink for RelayChannel {
    async fn publish(&self, event: RelayEvent) -> RelayResult<()> {
        debug!(
            channel = %self.channel,
            event = event.type_name(),
            "Publishing event"
        );
        self.transport
            .send(RelayMessage::event(
                self.channel.clone(),
                self.sender_id.clone(),
                event,
            ))
            .await
    }

    async fn is_connected(&self) -> bool {
        self.transport.is_connected().await
    }
}

// =============================================================================
// Background Task
// =============================================================================

/// Pumps transport messages into domain events, re-Joining after every
/// reconnect.
async fn channel_task(
    transport: TransportHandle,
    mut incoming_rx: mpsc::Receiver<RelayMessage>,
    event_tx: mpsc::Sender<RelayEvent>,
    channel: String,
    sender_id: String,
) {
    let mut joined = false;
    let mut poll = tokio::time::interval(JOIN_POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = incoming_rx.recv() => {
                let Some(msg) = msg else {
                    debug!(channel = %channel, "Transport closed, channel task ending");
                    return;
                };
                match msg {
                    RelayMessage::Joined(payload) => {
                        info!(channel = %payload.channel, "Joined relay channel");
                        joined = true;
                    }
                    RelayMessage::Event(envelope) => {
                        if envelope.channel != channel {
                            debug!(
                                got = %envelope.channel,
                                expected = %channel,
                                "Dropping envelope for another channel"
                            );
                            continue;
                        }
                        if envelope.sender_id == sender_id {
                            // Self-echo; the hub should have excluded us.
                            debug!(channel = %channel, "Dropping self-echo envelope");
                            continue;
                        }
                        if event_tx.send(envelope.event).await.is_err() {
                            debug!(channel = %channel, "Event consumer gone, channel task ending");
                            return;
                        }
                    }
                    RelayMessage::Error { code, message } => {
                        warn!(channel = %channel, code = %code, message = %message, "Hub error");
                    }
                    other => {
                        debug!(msg_type = other.type_name(), "Ignoring message");
                    }
                }
            }

            _ = poll.tick() => {
                let state = transport.state().await;
                match state {
                    ConnectionState::Connected if !joined => {
                        debug!(channel = %channel, "Sending Join handshake");
                        if transport
                            .send(RelayMessage::join(channel.clone(), sender_id.clone()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                        // Marked joined on the hub's Joined ack.
                    }
                    ConnectionState::Connected => {}
                    ConnectionState::GaveUp => {
                        warn!(channel = %channel, "Transport gave up, channel task ending");
                        return;
                    }
                    _ => {
                        // Any non-connected state invalidates the membership.
                        joined = false;
                    }
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_derives_channel_name() {
        // No hub needed; the transport retries in the background while we
        // inspect the handle.
        let mut config = ChannelConfig::new("ws://127.0.0.1:1/ws", " shop1 ", "dev-a");
        config.transport.max_retries = 1;
        config.transport.initial_backoff = Duration::from_millis(1);

        let (channel, _events) = RelayChannel::spawn(config);
        assert_eq!(channel.channel(), "pos-scanner-shop1");
        let _ = channel.shutdown().await;
    }
}
