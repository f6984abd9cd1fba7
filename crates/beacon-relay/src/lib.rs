//! # beacon-relay: Barcode Relay for Beacon POS
//!
//! Connects a scanner device to a POS terminal in real time: the scanner
//! publishes scan events on a named channel, the POS applies them to its
//! live cart and catalog.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Relay Architecture                                │
//! │                                                                         │
//! │   Scanner device                hub                      POS terminal   │
//! │                                                                         │
//! │  ┌──────────────┐       ┌──────────────┐         ┌──────────────┐      │
//! │  │ input:       │       │ RelayHub     │         │ PosSession   │      │
//! │  │ wedge/camera │       │ (axum WS)    │         │              │      │
//! │  │ /manual      │       │              │         │ cart add     │      │
//! │  └──────┬───────┘       │ named        │         │ catalog add  │      │
//! │         ▼               │ channels,    │         │ UI notices   │      │
//! │  ┌──────────────┐       │ sender       │         └──────▲───────┘      │
//! │  │ScannerSession│       │ exclusion    │                │              │
//! │  │ debounce,    │       └──▲────────┬──┘         ┌──────┴───────┐      │
//! │  │ resolve,     │          │        │            │ RelayChannel │      │
//! │  │ offline cart │          │        └───────────▶│ (join, echo  │      │
//! │  └──────┬───────┘          │                     │  filtering)  │      │
//! │         ▼                  │                     └──────▲───────┘      │
//! │  ┌──────────────┐          │                            │              │
//! │  │ RelayChannel │──────────┘                     ┌──────┴───────┐      │
//! │  └──────┬───────┘                                │  Transport   │      │
//! │         ▼                                        └──────────────┘      │
//! │  ┌──────────────┐                                                      │
//! │  │  Transport   │   reconnecting WS client, bounded attempts,          │
//! │  └──────────────┘   explicit GaveUp                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + env configuration, device identity
//! - [`error`] - Relay error types
//! - [`protocol`] - Wire messages (Join/Joined/Event envelopes)
//! - [`transport`] - WebSocket client with bounded reconnection
//! - [`channel`] - Channel membership, self-echo suppression, [`RelayLink`]
//! - [`hub`] - axum WebSocket broker with named channels
//! - [`input`] - Keyboard wedge, camera cooldown, manual entry, debounce
//! - [`scanner`] - Scanner session (relay or offline cart)
//! - [`pos`] - POS session (cart + catalog event handlers)

// =============================================================================
// Module Declarations
// =============================================================================

pub mod channel;
pub mod config;
pub mod error;
pub mod hub;
pub mod input;
pub mod pos;
pub mod protocol;
pub mod scanner;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use channel::{ChannelConfig, RelayChannel, RelayLink};
pub use config::BeaconConfig;
pub use error::{RelayError, RelayResult};
pub use hub::{hub_router, HubConfig, HubHandle, HubState, RelayHub};
pub use input::{CameraScanner, FrameDetector, KeyInput, KeyWedgeDecoder, ScanDebouncer};
pub use pos::{PosNotice, PosSession};
pub use protocol::{channel_name, Envelope, RelayEvent, RelayMessage};
pub use scanner::{ScanOutcome, ScannerSession};
pub use transport::{ConnectionState, Transport, TransportConfig, TransportHandle};
