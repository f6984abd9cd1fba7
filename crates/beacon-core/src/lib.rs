//! # beacon-core: Pure Business Logic for Beacon POS
//!
//! This crate is the **heart** of Beacon POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Beacon POS Architecture                           │
//! │                                                                         │
//! │  ┌───────────────────┐              ┌───────────────────┐              │
//! │  │  Scanner Session  │              │    POS Session    │              │
//! │  │  (beacon-relay)   │──── relay ──►│  (beacon-relay)   │              │
//! │  └─────────┬─────────┘   channel    └─────────┬─────────┘              │
//! │            │                                  │                         │
//! │  ┌─────────▼──────────────────────────────────▼─────────┐              │
//! │  │              ★ beacon-core (THIS CRATE) ★             │              │
//! │  │                                                       │              │
//! │  │  ┌─────────┐ ┌──────┐ ┌────────┐ ┌───────────┐       │              │
//! │  │  │  money  │ │ cart │ │ ledger │ │ analytics │       │              │
//! │  │  │  Money  │ │ Cart │ │ TXN id │ │  rollups  │       │              │
//! │  │  │ FeeRate │ │ line │ │ record │ │  summary  │       │              │
//! │  │  └─────────┘ └──────┘ └────────┘ └───────────┘       │              │
//! │  │                                                       │              │
//! │  │  NO I/O • NO NETWORK • PURE FUNCTIONS                 │              │
//! │  └───────────────────────────────────────────────────────┘              │
//! │            │                                                            │
//! │  ┌─────────▼─────────┐                                                  │
//! │  │   beacon-store    │  catalog state, remote mirror, bill history      │
//! │  └───────────────────┘                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Bill, PaymentMethod, etc.)
//! - [`money`] - Money, FeeRate and Quantity with integer arithmetic (no floating point!)
//! - [`cart`] - Cart lines with price snapshots and total computation
//! - [`ledger`] - Payment validation and transaction records
//! - [`bills`] - Bill assembly and bill-number generation
//! - [`analytics`] - Daily/weekly/monthly rollups over bill history
//! - [`export`] - CSV projection of bill records
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//!    (id generators take the clock value or expose a seeded variant for tests)
//! 2. **No I/O**: Network, file system, hardware access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use beacon_core::money::{Money, FeeRate, Quantity};
//! use beacon_core::cart::{Cart, FeeDirection};
//! use beacon_core::types::Product;
//!
//! let rice = Product::new(1, "1001", "Rice", Money::from_cents(5000), "kg", "Grains");
//!
//! let mut cart = Cart::new();
//! cart.add_line(&rice, Quantity::from_units(2)).unwrap();
//!
//! // 2 kg of rice at $50.00, 10% discount
//! let totals = cart.totals(FeeRate::from_percent(10), FeeDirection::Discount);
//! assert_eq!(totals.subtotal.cents(), 10000);
//! assert_eq!(totals.total.cents(), 9000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod bills;
pub mod cart;
pub mod error;
pub mod export;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use beacon_core::Money` instead of
// `use beacon_core::money::Money`

pub use cart::{Cart, CartLine, CartTotals, FeeDirection};
pub use error::{CoreError, ValidationError};
pub use money::{FeeRate, Money, Quantity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line, in milliunits (999.000)
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., scanning a weight of 1000 kg
/// when 10 kg was intended).
pub const MAX_LINE_QUANTITY_MILLI: i64 = 999_000;

/// Default unit assigned to products registered over the relay channel
/// when the payload omits one.
pub const DEFAULT_UNIT: &str = "pcs";

/// Default category assigned to products registered over the relay channel
/// when the payload omits one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
