//! # Relay Wire Protocol
//!
//! JSON message types exchanged between scanner/POS clients and the relay
//! hub. Every message is an adjacently tagged JSON object.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Protocol Flow                              │
//! │                                                                         │
//! │  Scanner                     Hub                          POS           │
//! │     │                         │                            │            │
//! │     │── Join {channel, id} ──►│◄── Join {channel, id} ─────│            │
//! │     │◄─ Joined ───────────────│──── Joined ───────────────►│            │
//! │     │                         │                            │            │
//! │     │── Event(Envelope) ─────►│                            │            │
//! │     │   barcode_scanned       │──── Event(Envelope) ──────►│            │
//! │     │                         │     (sender excluded)      │            │
//! │     │                         │                            │            │
//! │     │◄─ Ping ─────────────────│──── Ping ─────────────────►│            │
//! │     │── Pong ────────────────►│◄─── Pong ──────────────────│            │
//! │                                                                         │
//! │  Wire format (adjacently tagged):                                      │
//! │  {"type":"Event","payload":{"channel":"pos-scanner-shop1",             │
//! │   "senderId":"...","event":{"type":"barcode_scanned",                  │
//! │   "payload":{"barcode":"1001","quantity":1000,...}}}}                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use beacon_core::types::barcode_string_or_number;
use beacon_core::{Money, Quantity, DEFAULT_CATEGORY, DEFAULT_UNIT};

// =============================================================================
// Channel Naming
// =============================================================================

/// Prefix shared by every relay channel name.
pub const CHANNEL_PREFIX: &str = "pos-scanner-";

/// Derives the channel name for a user-chosen identifier.
///
/// A scanner and a POS terminal pair up by entering the same identifier;
/// both ends derive `pos-scanner-<identifier>` independently.
pub fn channel_name(identifier: &str) -> String {
    format!("{}{}", CHANNEL_PREFIX, identifier.trim())
}

// =============================================================================
// Event Payloads
// =============================================================================

/// A barcode the scanner resolved against its own catalog copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeScannedPayload {
    #[serde(deserialize_with = "barcode_string_or_number")]
    pub barcode: String,

    /// Name as resolved on the scanner; display hint only, the POS
    /// re-resolves against its live catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    /// Scanned quantity in milliunits (1.000 unit = 1000).
    pub quantity: Quantity,

    /// RFC 3339 scan time on the scanner's clock.
    pub timestamp: String,
}

fn default_price() -> Money {
    Money::zero()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A request to create a product the scanner could not resolve.
///
/// Fields arrive from hand-filled forms, so every optional field carries a
/// serde default and [`AddProductPayload::normalized`] enforces the coercion
/// rules before the POS touches its catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductPayload {
    pub name: String,

    #[serde(deserialize_with = "barcode_string_or_number")]
    pub barcode: String,

    /// Price in cents; defaults to 0 when the form leaves it blank.
    #[serde(default = "default_price")]
    pub price_cents: Money,

    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default = "default_category")]
    pub category: String,
}

impl AddProductPayload {
    /// Applies the coercion rules: trimmed barcode, price clamped at zero,
    /// blank unit/category replaced with their defaults.
    pub fn normalized(mut self) -> Self {
        self.barcode = self.barcode.trim().to_string();
        self.name = self.name.trim().to_string();
        self.price_cents = self.price_cents.clamp_at_zero();
        if self.unit.trim().is_empty() {
            self.unit = default_unit();
        }
        if self.category.trim().is_empty() {
            self.category = default_category();
        }
        self
    }
}

/// A hint that the POS should open its add-product form pre-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAddProductPayload {
    #[serde(deserialize_with = "barcode_string_or_number")]
    pub barcode: String,

    pub timestamp: String,
}

// =============================================================================
// Relay Events
// =============================================================================

/// Domain events relayed between paired devices.
///
/// Tags match what both page variants emit, so a Rust POS interoperates
/// with a browser scanner and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RelayEvent {
    #[serde(rename = "barcode_scanned")]
    BarcodeScanned(BarcodeScannedPayload),

    #[serde(rename = "add_product")]
    AddProduct(AddProductPayload),

    #[serde(rename = "open_add_product")]
    OpenAddProduct(OpenAddProductPayload),
}

impl RelayEvent {
    /// The wire tag, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayEvent::BarcodeScanned(_) => "barcode_scanned",
            RelayEvent::AddProduct(_) => "add_product",
            RelayEvent::OpenAddProduct(_) => "open_add_product",
        }
    }

    /// Creates a `barcode_scanned` event stamped with the current time.
    pub fn barcode_scanned(
        barcode: impl Into<String>,
        product_name: Option<String>,
        quantity: Quantity,
    ) -> Self {
        RelayEvent::BarcodeScanned(BarcodeScannedPayload {
            barcode: barcode.into(),
            product_name,
            quantity,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Creates an `open_add_product` hint stamped with the current time.
    pub fn open_add_product(barcode: impl Into<String>) -> Self {
        RelayEvent::OpenAddProduct(OpenAddProductPayload {
            barcode: barcode.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// A routed event: which channel it belongs to and who sent it.
///
/// `sender_id` drives self-echo suppression twice over: the hub excludes
/// the sender from the broadcast, and clients drop any envelope carrying
/// their own id in case an older hub forwards it anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub channel: String,
    pub sender_id: String,
    pub event: RelayEvent,
}

// =============================================================================
// Handshake Payloads
// =============================================================================

/// First message a client sends after the socket opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    /// Full channel name, e.g. "pos-scanner-shop1".
    pub channel: String,

    /// The client's stable sender id (device uuid).
    pub sender_id: String,
}

/// Hub's acknowledgement of a successful Join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPayload {
    pub channel: String,

    /// RFC 3339 hub time, for clock-skew diagnostics.
    pub server_time: String,
}

// =============================================================================
// Relay Messages
// =============================================================================

/// Top-level message on a relay WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RelayMessage {
    /// Client → hub: subscribe to a named channel.
    Join(JoinPayload),

    /// Hub → client: Join accepted.
    Joined(JoinedPayload),

    /// Either direction: a routed domain event.
    Event(Envelope),

    /// Keepalive probe.
    Ping,

    /// Keepalive response.
    Pong,

    /// Hub → client: protocol-level rejection.
    Error { code: String, message: String },
}

impl RelayMessage {
    /// The message type tag, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayMessage::Join(_) => "Join",
            RelayMessage::Joined(_) => "Joined",
            RelayMessage::Event(_) => "Event",
            RelayMessage::Ping => "Ping",
            RelayMessage::Pong => "Pong",
            RelayMessage::Error { .. } => "Error",
        }
    }

    /// Creates a Join handshake message.
    pub fn join(channel: impl Into<String>, sender_id: impl Into<String>) -> Self {
        RelayMessage::Join(JoinPayload {
            channel: channel.into(),
            sender_id: sender_id.into(),
        })
    }

    /// Creates a Joined acknowledgement stamped with the current time.
    pub fn joined(channel: impl Into<String>) -> Self {
        RelayMessage::Joined(JoinedPayload {
            channel: channel.into(),
            server_time: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Wraps an event in an envelope for the given channel and sender.
    pub fn event(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        event: RelayEvent,
    ) -> Self {
        RelayMessage::Event(Envelope {
            channel: channel.into(),
            sender_id: sender_id.into(),
            event,
        })
    }

    /// Creates an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        RelayMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Serializes to the wire JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses from the wire JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_from_identifier() {
        assert_eq!(channel_name("shop1"), "pos-scanner-shop1");
        assert_eq!(channel_name("  shop1  "), "pos-scanner-shop1");
    }

    #[test]
    fn test_barcode_scanned_round_trip() {
        let msg = RelayMessage::event(
            "pos-scanner-shop1",
            "dev-a",
            RelayEvent::barcode_scanned("1001", Some("Rice".into()), Quantity::one()),
        );

        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"Event""#));
        assert!(json.contains(r#""type":"barcode_scanned""#));
        assert!(json.contains(r#""senderId":"dev-a""#));

        let parsed = RelayMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_add_product_defaults_and_numeric_barcode() {
        // A sparse payload straight from a form submission.
        let json = r#"{
            "type": "add_product",
            "payload": { "name": "Eggs", "barcode": 2001 }
        }"#;

        let event: RelayEvent = serde_json::from_str(json).unwrap();
        match event {
            RelayEvent::AddProduct(payload) => {
                assert_eq!(payload.barcode, "2001");
                assert_eq!(payload.price_cents, Money::zero());
                assert_eq!(payload.unit, "pcs");
                assert_eq!(payload.category, "Uncategorized");
            }
            other => panic!("expected AddProduct, got {other:?}"),
        }
    }

    #[test]
    fn test_add_product_normalized_coercion() {
        let payload = AddProductPayload {
            name: "  Eggs  ".to_string(),
            barcode: " 2001 ".to_string(),
            price_cents: Money::from_cents(-500),
            unit: "  ".to_string(),
            category: "".to_string(),
        }
        .normalized();

        assert_eq!(payload.name, "Eggs");
        assert_eq!(payload.barcode, "2001");
        assert_eq!(payload.price_cents, Money::zero());
        assert_eq!(payload.unit, "pcs");
        assert_eq!(payload.category, "Uncategorized");
    }

    #[test]
    fn test_join_handshake_wire_shape() {
        let msg = RelayMessage::join("pos-scanner-shop1", "dev-a");
        let json = msg.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"Join","payload":{"channel":"pos-scanner-shop1","senderId":"dev-a"}}"#
        );
    }

    #[test]
    fn test_unknown_event_tag_is_rejected() {
        let json = r#"{"type":"inventory_delta","payload":{}}"#;
        assert!(serde_json::from_str::<RelayEvent>(json).is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(RelayMessage::Ping.type_name(), "Ping");
        assert_eq!(
            RelayEvent::open_add_product("9001").type_name(),
            "open_add_product"
        );
    }
}
