//! # Domain Types
//!
//! Core domain types shared by every layer of Beacon POS.
//!
//! ## Type Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Who Owns What                                    │
//! │                                                                         │
//! │  Product ──────► owned by the ProductCatalog (beacon-store);           │
//! │                  mutated only through catalog operations               │
//! │                                                                         │
//! │  Bill ─────────► created at checkout from the live cart;               │
//! │                  immutable once created; appended to the bill log      │
//! │                                                                         │
//! │  PaymentRecord ► produced by the PaymentLedger; immutable              │
//! │                                                                         │
//! │  PaymentMethod ► a closed tag; method mechanics are interchangeable    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::cart::CartLine;
use crate::money::{FeeRate, Money};

// =============================================================================
// Barcode Coercion
// =============================================================================

/// Deserializes a barcode that may arrive as a JSON string OR number.
///
/// Camera detectors and hand-typed entry produce strings; some catalog
/// seeds and older clients send bare numbers. Both normalize to a trimmed
/// string so lookups compare like with like.
pub fn barcode_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().to_string(),
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => {
            // Whole-valued floats print without a trailing ".0"
            if n.fract() == 0.0 && n.abs() < 9e15 {
                format!("{}", n as i64)
            } else {
                format!("{}", n)
            }
        }
    })
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item in the catalog.
///
/// ## Identity
/// `id` is assigned by the catalog as `max(existing ids) + 1` - monotonic
/// within a session, not globally unique across devices. `barcode` is the
/// primary lookup key but is NOT enforced unique; the first matching entry
/// wins on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog-assigned identifier.
    pub id: i64,

    /// Lookup key. Always stored trimmed; may arrive as a JSON number from
    /// some scan sources, so deserialization coerces to a string.
    #[serde(deserialize_with = "barcode_string_or_number")]
    pub barcode: String,

    /// Display name (e.g., "Cooking Oil").
    pub name: String,

    /// Unit price in cents.
    pub price: Money,

    /// Sale unit: "kg", "g", "L", "pcs", ...
    pub unit: String,

    /// Free-form grouping (e.g., "Grains", "Dairy").
    pub category: String,
}

impl Product {
    /// Convenience constructor that trims the barcode.
    pub fn new(
        id: i64,
        barcode: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        unit: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Product {
            id,
            barcode: barcode.into().trim().to_string(),
            name: name.into(),
            price,
            unit: unit.into(),
            category: category.into(),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
///
/// A closed set of tags - the ledger validates against it, analytics group
/// by it. Gateway mechanics live outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(rename = "UPI")]
    Upi,
    Online,
}

impl PaymentMethod {
    /// All methods accepted by a default ledger.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::Online,
    ];

    /// Parses a user-supplied method tag, case-insensitively.
    /// Returns None for anything outside the closed set.
    pub fn parse(s: &str) -> Option<PaymentMethod> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::Upi => write!(f, "UPI"),
            PaymentMethod::Online => write!(f, "Online"),
        }
    }
}

// =============================================================================
// Payment Record
// =============================================================================

/// Lifecycle status of a payment record.
///
/// Only `Completed` is produced today; the enum exists so the bill log
/// format does not change when refunds arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
}

/// An immutable record of one accepted payment.
///
/// Produced by [`crate::ledger::PaymentLedger::record`]. The transaction id
/// is best-effort unique (timestamp + random suffix), not guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub amount: Money,
    pub method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
    pub status: PaymentStatus,
    pub transaction_id: String,
}

// =============================================================================
// Bill
// =============================================================================

/// An immutable record of one completed sale.
///
/// Created at checkout from the live cart (see [`crate::bills`]); persisted
/// to the local bill log and best-effort mirrored to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// "BL" or "SC" + YYYYMMDD + 3-digit random suffix.
    pub bill_id: String,

    /// Snapshot of the cart lines at checkout time.
    pub items: Vec<CartLine>,

    pub subtotal: Money,

    /// The applied discount or tax rate.
    pub fee_percent: FeeRate,

    /// Whether the fee was subtracted (discount) or added (tax).
    pub fee_direction: crate::cart::FeeDirection,

    pub fee_amount: Money,

    pub total: Money,

    pub payment_method: PaymentMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
