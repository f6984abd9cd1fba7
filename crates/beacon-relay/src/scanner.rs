//! # Scanner Session
//!
//! Orchestrates the scanner device: every accepted scan either relays to
//! the paired POS, prompts for a new product, or falls back to the local
//! offline cart.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              accepted scan (already past the debouncer)                 │
//! │                                                                         │
//! │   catalog hit?   link up?   action                       outcome        │
//! │   ───────────    ────────   ────────────────────────     ───────────    │
//! │   yes            yes        publish barcode_scanned      Relayed        │
//! │                             (NO local cart mutation;                    │
//! │                              the POS owns the cart)                     │
//! │   yes            no         add to offline cart          AddedOffline   │
//! │   no             yes        publish open_add_product     PromptAdd      │
//! │                             + prompt locally                            │
//! │   no             no         prompt locally only          PromptAdd      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The offline cart is a real cart: the scanner can finish a sale on its
//! own (tax-direction fee, "SC" bill prefix) when the POS is unreachable.

use std::sync::Arc;

use tracing::{debug, info, warn};

use beacon_core::bills::{checkout, BillPrefix, CustomerInfo};
use beacon_core::cart::{Cart, CartTotals, FeeDirection};
use beacon_core::error::CoreResult;
use beacon_core::types::{Bill, PaymentMethod, Product};
use beacon_core::{FeeRate, Quantity};
use beacon_store::catalog::CatalogState;

use crate::channel::RelayLink;
use crate::input::ScanDebouncer;
use crate::protocol::RelayEvent;

// =============================================================================
// Scan Outcomes
// =============================================================================

/// What the session did with one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Dropped by the debounce gate; nothing happened.
    Debounced,

    /// Published to the paired POS.
    Relayed { product: Product },

    /// Unknown barcode; the operator should be asked to register it.
    PromptAddProduct { barcode: String },

    /// Link down; the product went into the local offline cart.
    AddedOffline { product: Product },
}

// =============================================================================
// Scanner Session
// =============================================================================

/// One scanner device's running state.
pub struct ScannerSession {
    catalog: CatalogState,
    link: Arc<dyn RelayLink>,
    debouncer: ScanDebouncer,
    offline_cart: Cart,
    offline_fee: FeeRate,
}

impl ScannerSession {
    pub fn new(catalog: CatalogState, link: Arc<dyn RelayLink>) -> Self {
        ScannerSession {
            catalog,
            link,
            debouncer: ScanDebouncer::new(),
            offline_cart: Cart::new(),
            offline_fee: FeeRate::zero(),
        }
    }

    /// Sets the tax rate applied to offline checkouts.
    pub fn set_offline_fee(&mut self, fee: FeeRate) {
        self.offline_fee = fee;
    }

    /// Handles one raw scan from any input source.
    pub async fn handle_scan(&mut self, barcode: &str, quantity: Quantity) -> ScanOutcome {
        if !self.debouncer.try_accept() {
            debug!(barcode = %barcode, "Scan debounced");
            return ScanOutcome::Debounced;
        }
        let outcome = self.process_scan(barcode, quantity).await;
        self.debouncer.complete();
        outcome
    }

    async fn process_scan(&mut self, barcode: &str, quantity: Quantity) -> ScanOutcome {
        let connected = self.link.is_connected().await;

        match self.catalog.find_by_barcode(barcode) {
            Some(product) if connected => {
                let event = RelayEvent::barcode_scanned(
                    product.barcode.clone(),
                    Some(product.name.clone()),
                    quantity,
                );
                if let Err(err) = self.link.publish(event).await {
                    // Publish failed under us; treat it as an offline scan
                    // so the sale is not lost.
                    warn!(barcode = %barcode, error = %err, "Publish failed, falling back to offline cart");
                    return self.add_offline(product, quantity);
                }
                info!(barcode = %product.barcode, name = %product.name, "Scan relayed");
                ScanOutcome::Relayed { product }
            }

            Some(product) => self.add_offline(product, quantity),

            None => {
                info!(barcode = %barcode, "Unknown barcode");
                if connected {
                    let event = RelayEvent::open_add_product(barcode.trim());
                    if let Err(err) = self.link.publish(event).await {
                        warn!(barcode = %barcode, error = %err, "Failed to publish add-product hint");
                    }
                }
                ScanOutcome::PromptAddProduct {
                    barcode: barcode.trim().to_string(),
                }
            }
        }
    }

    fn add_offline(&mut self, product: Product, quantity: Quantity) -> ScanOutcome {
        match self.offline_cart.add_line(&product, quantity) {
            Ok(()) => {
                info!(barcode = %product.barcode, name = %product.name, "Added to offline cart");
                ScanOutcome::AddedOffline { product }
            }
            Err(err) => {
                warn!(barcode = %product.barcode, error = %err, "Offline cart rejected line");
                ScanOutcome::PromptAddProduct {
                    barcode: product.barcode,
                }
            }
        }
    }

    /// The local offline cart.
    pub fn offline_cart(&self) -> &Cart {
        &self.offline_cart
    }

    /// Offline totals; the scanner-side fee is always a tax.
    pub fn offline_totals(&self) -> CartTotals {
        self.offline_cart.totals(self.offline_fee, FeeDirection::Tax)
    }

    /// Completes the offline sale with an "SC"-prefixed bill and clears
    /// the cart.
    pub fn checkout_offline(
        &mut self,
        method: PaymentMethod,
        customer: CustomerInfo,
    ) -> CoreResult<Bill> {
        let bill = checkout(
            &self.offline_cart,
            BillPrefix::Scanner,
            self.offline_fee,
            FeeDirection::Tax,
            method,
            customer,
        )?;
        self.offline_cart.clear();
        info!(bill_id = %bill.bill_id, total = %bill.total, "Offline checkout complete");
        Ok(bill)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayResult;
    use async_trait::async_trait;
    use beacon_core::Money;
    use beacon_store::catalog::ProductCatalog;
    use std::sync::Mutex;
    use tokio::time::{advance, Duration};

    /// In-memory link that records published events.
    struct FakeLink {
        connected: bool,
        published: Mutex<Vec<RelayEvent>>,
    }

    impl FakeLink {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(FakeLink {
                connected,
                published: Mutex::new(Vec::new()),
            })
        }

        fn published(&self) -> Vec<RelayEvent> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelayLink for FakeLink {
        async fn publish(&self, event: RelayEvent) -> RelayResult<()> {
            self.published.lock().unwrap().push(event);
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn session(link: Arc<FakeLink>) -> ScannerSession {
        let catalog = CatalogState::new(ProductCatalog::with_defaults());
        ScannerSession::new(catalog, link)
    }

    #[tokio::test(start_paused = true)]
    async fn test_known_barcode_relays_without_local_mutation() {
        let link = FakeLink::new(true);
        let mut session = session(link.clone());

        let outcome = session.handle_scan("1001", Quantity::one()).await;
        match outcome {
            ScanOutcome::Relayed { product } => assert_eq!(product.name, "Rice"),
            other => panic!("expected Relayed, got {other:?}"),
        }

        // Relay-only: the offline cart stays empty.
        assert!(session.offline_cart().is_empty());

        let events = link.published();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RelayEvent::BarcodeScanned(p) => {
                assert_eq!(p.barcode, "1001");
                assert_eq!(p.product_name.as_deref(), Some("Rice"));
            }
            other => panic!("expected BarcodeScanned, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_barcode_prompts_and_hints() {
        let link = FakeLink::new(true);
        let mut session = session(link.clone());

        let outcome = session.handle_scan(" 9001 ", Quantity::one()).await;
        assert_eq!(
            outcome,
            ScanOutcome::PromptAddProduct {
                barcode: "9001".to_string()
            }
        );

        let events = link.published();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RelayEvent::OpenAddProduct(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_barcode_offline_prompts_without_publish() {
        let link = FakeLink::new(false);
        let mut session = session(link.clone());

        let outcome = session.handle_scan("9001", Quantity::one()).await;
        assert!(matches!(outcome, ScanOutcome::PromptAddProduct { .. }));
        assert!(link.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_scan_builds_local_cart() {
        let link = FakeLink::new(false);
        let mut session = session(link.clone());

        let outcome = session.handle_scan("1001", Quantity::one()).await;
        assert!(matches!(outcome, ScanOutcome::AddedOffline { .. }));
        assert!(link.published().is_empty());

        let lines = session.offline_cart().lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].barcode, "1001");
        assert_eq!(lines[0].quantity, Quantity::one());
        assert_eq!(lines[0].price, Money::from_cents(5000));
        assert_eq!(session.offline_totals().subtotal, Money::from_cents(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_rescan_is_debounced() {
        let link = FakeLink::new(false);
        let mut session = session(link);

        assert!(matches!(
            session.handle_scan("1001", Quantity::one()).await,
            ScanOutcome::AddedOffline { .. }
        ));

        // Same code again inside the window.
        advance(Duration::from_millis(200)).await;
        assert_eq!(
            session.handle_scan("1001", Quantity::one()).await,
            ScanOutcome::Debounced
        );

        advance(Duration::from_millis(400)).await;
        assert!(matches!(
            session.handle_scan("1001", Quantity::one()).await,
            ScanOutcome::AddedOffline { .. }
        ));

        // Two accepted scans of the same product accumulate.
        assert_eq!(session.offline_cart().lines()[0].quantity, Quantity::from_units(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_checkout_uses_scanner_prefix_and_tax() {
        let link = FakeLink::new(false);
        let mut session = session(link);
        session.set_offline_fee(FeeRate::from_percent(10));

        session.handle_scan("1001", Quantity::one()).await;

        let bill = session
            .checkout_offline(PaymentMethod::Cash, CustomerInfo::default())
            .unwrap();

        assert!(bill.bill_id.starts_with("SC"));
        assert_eq!(bill.fee_direction, FeeDirection::Tax);
        assert_eq!(bill.subtotal, Money::from_cents(5000));
        assert_eq!(bill.total, Money::from_cents(5500));
        assert!(session.offline_cart().is_empty());
    }
}
