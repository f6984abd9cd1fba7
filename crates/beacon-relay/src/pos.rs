//! # POS Session
//!
//! The POS terminal's side of the relay: applies incoming scanner events
//! to the live cart and catalog, and surfaces a notice for the UI after
//! each one.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      POS Event Handling                                 │
//! │                                                                         │
//! │  barcode_scanned ──► resolve in LIVE catalog (never trust the          │
//! │                      scanner's copy)                                   │
//! │                        hit  → cart.add_line  → Added                   │
//! │                        miss → NotFound (no auto-prompt; the POS        │
//! │                               operator decides what to do)             │
//! │                                                                         │
//! │  add_product ─────► coerce payload, then:                              │
//! │                        barcode already resolves → first write wins,    │
//! │                        skip the insert           → DuplicateSkipped    │
//! │                        else catalog.add + verify → ProductRegistered   │
//! │                                                                         │
//! │  open_add_product ► UI hint only, no catalog mutation                  │
//! │                                                  → PrefillAddForm      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{error, info, warn};

use beacon_core::bills::{checkout, BillPrefix, CustomerInfo};
use beacon_core::cart::{Cart, CartTotals, FeeDirection};
use beacon_core::error::CoreResult;
use beacon_core::types::{Bill, PaymentMethod, Product};
use beacon_core::{FeeRate, Quantity};
use beacon_store::catalog::{CatalogState, NewProduct};

use crate::protocol::{AddProductPayload, RelayEvent};

// =============================================================================
// Notices
// =============================================================================

/// What the UI should show after one relay event.
#[derive(Debug, Clone, PartialEq)]
pub enum PosNotice {
    /// The scanned product landed in the cart.
    Added { product: Product, quantity: Quantity },

    /// The barcode is unknown to the live catalog.
    NotFound { barcode: String },

    /// A new product was registered from the scanner's form.
    ProductRegistered { product: Product },

    /// The barcode already resolved; the insert was skipped.
    DuplicateSkipped { barcode: String, existing: Product },

    /// Open the add-product form pre-filled with this barcode.
    PrefillAddForm { barcode: String },

    /// The event was rejected (validation or cart limits).
    Rejected { reason: String },
}

// =============================================================================
// POS Session
// =============================================================================

/// One POS terminal's running state.
pub struct PosSession {
    catalog: CatalogState,
    cart: Cart,
    fee_percent: FeeRate,
    fee_direction: FeeDirection,
}

impl PosSession {
    pub fn new(catalog: CatalogState) -> Self {
        PosSession {
            catalog,
            cart: Cart::new(),
            fee_percent: FeeRate::zero(),
            fee_direction: FeeDirection::Discount,
        }
    }

    /// Sets the fee applied at the next totals/checkout.
    pub fn set_fee(&mut self, fee_percent: FeeRate, direction: FeeDirection) {
        self.fee_percent = fee_percent;
        self.fee_direction = direction;
    }

    /// Applies one relay event.
    pub fn handle_event(&mut self, event: RelayEvent) -> PosNotice {
        match event {
            RelayEvent::BarcodeScanned(payload) => {
                self.handle_barcode(&payload.barcode, payload.quantity)
            }
            RelayEvent::AddProduct(payload) => self.handle_add_product(payload),
            RelayEvent::OpenAddProduct(payload) => {
                info!(barcode = %payload.barcode, "Scanner requested add-product form");
                PosNotice::PrefillAddForm {
                    barcode: payload.barcode,
                }
            }
        }
    }

    /// Resolves a scanned barcode against the live catalog and adds it to
    /// the cart. Local scans (wedge/manual on the POS itself) take the same
    /// path.
    pub fn handle_barcode(&mut self, barcode: &str, quantity: Quantity) -> PosNotice {
        let Some(product) = self.catalog.find_by_barcode(barcode) else {
            info!(barcode = %barcode, "Scanned barcode not in catalog");
            return PosNotice::NotFound {
                barcode: barcode.trim().to_string(),
            };
        };

        match self.cart.add_line(&product, quantity) {
            Ok(()) => {
                info!(barcode = %product.barcode, name = %product.name, "Added to cart");
                PosNotice::Added { product, quantity }
            }
            Err(err) => {
                warn!(barcode = %product.barcode, error = %err, "Cart rejected line");
                PosNotice::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn handle_add_product(&mut self, payload: AddProductPayload) -> PosNotice {
        let payload = payload.normalized();

        // First write wins: a product registered (on any device) between
        // the scanner's miss and this event keeps its data.
        if let Some(existing) = self.catalog.find_by_barcode(&payload.barcode) {
            info!(
                barcode = %payload.barcode,
                existing = %existing.name,
                "Product already registered, skipping insert"
            );
            return PosNotice::DuplicateSkipped {
                barcode: payload.barcode,
                existing,
            };
        }

        let new = NewProduct {
            barcode: payload.barcode.clone(),
            name: payload.name,
            price: payload.price_cents,
            unit: payload.unit,
            category: payload.category,
        };

        match self.catalog.add(new) {
            Ok(product) => {
                // The very next scan of this code must resolve.
                if self.catalog.find_by_barcode(&payload.barcode).is_none() {
                    error!(
                        barcode = %payload.barcode,
                        "Registered product does not resolve by barcode"
                    );
                }
                info!(
                    barcode = %product.barcode,
                    name = %product.name,
                    id = product.id,
                    "Product registered from scanner"
                );
                PosNotice::ProductRegistered { product }
            }
            Err(err) => {
                warn!(barcode = %payload.barcode, error = %err, "Add-product rejected");
                PosNotice::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cart operations
    // -------------------------------------------------------------------------

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals(self.fee_percent, self.fee_direction)
    }

    /// Completes the sale with a "BL"-prefixed bill and clears the cart.
    pub fn checkout(&mut self, method: PaymentMethod, customer: CustomerInfo) -> CoreResult<Bill> {
        let bill = checkout(
            &self.cart,
            BillPrefix::Pos,
            self.fee_percent,
            self.fee_direction,
            method,
            customer,
        )?;
        self.cart.clear();
        info!(bill_id = %bill.bill_id, total = %bill.total, "Checkout complete");
        Ok(bill)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
