//! # Product Catalog
//!
//! The in-memory product list - the read-of-record for a running session.
//!
//! ## Local-First Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Catalog Read/Write Paths                             │
//! │                                                                         │
//! │  load()                                                                 │
//! │    ├── mirror reachable, rows returned → use them                      │
//! │    └── ANY failure (network, bad status, empty body)                   │
//! │        → built-in default catalog, warn logged, NEVER an error         │
//! │                                                                         │
//! │  add / update / remove                                                  │
//! │    1. mutate local state (always succeeds once validated)              │
//! │    2. enqueue a MirrorOp on the outbox (retried, bounded, surfaced)    │
//! │                                                                         │
//! │  Two devices CAN diverge until a full reload - accepted trade-off.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookup normalizes barcodes to trimmed strings on both sides because scan
//! sources disagree about types (camera OCR vs hand-typed vs catalog-seeded).

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

use beacon_core::error::CoreResult;
use beacon_core::types::Product;
use beacon_core::validation::{validate_barcode, validate_price_cents, validate_product_name};
use beacon_core::Money;

use crate::outbox::MirrorOp;
use crate::rest::{Mirror, ProductPatch};

// =============================================================================
// Default Catalog
// =============================================================================

/// The built-in fallback catalog, used whenever the mirror is unreachable.
pub fn default_catalog() -> Vec<Product> {
    vec![
        Product::new(1, "1001", "Rice", Money::from_cents(5000), "kg", "Grains"),
        Product::new(2, "1002", "Wheat Flour", Money::from_cents(4500), "kg", "Grains"),
        Product::new(3, "1003", "Sugar", Money::from_cents(5500), "kg", "Grains"),
        Product::new(4, "1004", "Salt", Money::from_cents(1500), "g", "Spices"),
        Product::new(5, "1005", "Cooking Oil", Money::from_cents(12000), "L", "Oil"),
        Product::new(6, "1006", "Milk", Money::from_cents(6000), "L", "Dairy"),
        Product::new(7, "1007", "Bread", Money::from_cents(3000), "pcs", "Bakery"),
        Product::new(8, "1008", "Butter", Money::from_cents(28000), "g", "Dairy"),
        Product::new(9, "1009", "Apple", Money::from_cents(10000), "kg", "Fruits"),
        Product::new(10, "1010", "Banana", Money::from_cents(4000), "pcs", "Fruits"),
    ]
}

// =============================================================================
// New Product Input
// =============================================================================

/// Input shape for registering a product; the catalog assigns the id.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    pub price: Money,
    pub unit: String,
    pub category: String,
}

// =============================================================================
// Product Catalog
// =============================================================================

/// In-memory product list with local-first mutation semantics.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Creates a catalog seeded with the default product set.
    pub fn with_defaults() -> Self {
        ProductCatalog {
            products: default_catalog(),
        }
    }

    /// Creates a catalog from explicit products.
    pub fn from_products(products: Vec<Product>) -> Self {
        ProductCatalog { products }
    }

    /// Loads the catalog from the mirror, degrading to defaults on ANY
    /// failure. Never returns an error past this boundary.
    pub async fn load(mirror: &dyn Mirror) -> Self {
        match mirror.list_products().await {
            Ok(products) if !products.is_empty() => {
                info!(count = products.len(), "Loaded catalog from mirror");
                ProductCatalog::from_products(products)
            }
            Ok(_) => {
                warn!("Mirror returned an empty catalog, falling back to defaults");
                ProductCatalog::with_defaults()
            }
            Err(err) => {
                warn!(error = %err, "Catalog load failed, falling back to defaults");
                ProductCatalog::with_defaults()
            }
        }
    }

    fn next_id(&self) -> i64 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Registers a product, assigning the next id.
    ///
    /// Returns the stored product (with its assigned id).
    pub fn add(&mut self, new: NewProduct) -> CoreResult<Product> {
        validate_barcode(&new.barcode)?;
        validate_product_name(&new.name)?;
        validate_price_cents(new.price.cents())?;

        let product = Product::new(
            self.next_id(),
            new.barcode,
            new.name,
            new.price,
            new.unit,
            new.category,
        );
        self.products.push(product.clone());
        Ok(product)
    }

    /// Applies a patch to the product with the given id.
    ///
    /// Returns the updated product, or None if the id is unknown.
    pub fn update(&mut self, id: i64, patch: &ProductPatch) -> Option<Product> {
        let product = self.products.iter_mut().find(|p| p.id == id)?;

        if let Some(barcode) = &patch.barcode {
            product.barcode = barcode.trim().to_string();
        }
        if let Some(name) = &patch.name {
            product.name = name.clone();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(unit) = &patch.unit {
            product.unit = unit.clone();
        }
        if let Some(category) = &patch.category {
            product.category = category.clone();
        }

        Some(product.clone())
    }

    /// Removes the product with the given id.
    pub fn remove(&mut self, id: i64) -> Option<Product> {
        let index = self.products.iter().position(|p| p.id == id)?;
        Some(self.products.remove(index))
    }

    /// Exact match after normalizing both sides to trimmed strings.
    /// First matching entry wins (barcodes are not enforced unique).
    pub fn find_by_barcode(&self, barcode: &str) -> Option<&Product> {
        let needle = barcode.trim();
        if needle.is_empty() {
            return None;
        }
        self.products.iter().find(|p| p.barcode.trim() == needle)
    }

    /// Case-insensitive substring match against name OR barcode.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.barcode.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

// =============================================================================
// Shared Catalog State
// =============================================================================

/// Thread-safe catalog shared between sessions, with mirror write-behind.
///
/// Mutations apply locally first, then enqueue a [`MirrorOp`]; the outbox
/// processor owns retries and give-up reporting. A state without an outbox
/// sender (offline mode, tests) simply skips the mirroring step.
#[derive(Clone)]
pub struct CatalogState {
    inner: Arc<Mutex<ProductCatalog>>,
    outbox: Option<mpsc::UnboundedSender<MirrorOp>>,
}

impl CatalogState {
    pub fn new(catalog: ProductCatalog) -> Self {
        CatalogState {
            inner: Arc::new(Mutex::new(catalog)),
            outbox: None,
        }
    }

    /// Attaches the outbox sender; subsequent mutations are mirrored.
    pub fn with_outbox(mut self, outbox: mpsc::UnboundedSender<MirrorOp>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    fn enqueue(&self, op: MirrorOp) {
        if let Some(outbox) = &self.outbox {
            // A closed outbox means shutdown is underway; local state is
            // still authoritative, so this is not an error.
            if outbox.send(op).is_err() {
                warn!("Mirror outbox is closed, skipping remote write");
            }
        }
    }

    /// Runs a closure with read access to the catalog.
    pub fn with_catalog<T>(&self, f: impl FnOnce(&ProductCatalog) -> T) -> T {
        let guard = self.inner.lock().expect("catalog mutex poisoned");
        f(&guard)
    }

    /// Local-first add: mutate, then mirror.
    pub fn add(&self, new: NewProduct) -> CoreResult<Product> {
        let product = {
            let mut guard = self.inner.lock().expect("catalog mutex poisoned");
            guard.add(new)?
        };
        self.enqueue(MirrorOp::InsertProduct(product.clone()));
        Ok(product)
    }

    /// Local-first update: mutate, then mirror. None if the id is unknown.
    pub fn update(&self, id: i64, patch: ProductPatch) -> Option<Product> {
        let updated = {
            let mut guard = self.inner.lock().expect("catalog mutex poisoned");
            guard.update(id, &patch)?
        };
        self.enqueue(MirrorOp::PatchProduct { id, patch });
        Some(updated)
    }

    /// Local-first remove: mutate, then mirror. None if the id is unknown.
    pub fn remove(&self, id: i64) -> Option<Product> {
        let removed = {
            let mut guard = self.inner.lock().expect("catalog mutex poisoned");
            guard.remove(id)?
        };
        self.enqueue(MirrorOp::DeleteProduct { id });
        Some(removed)
    }

    pub fn find_by_barcode(&self, barcode: &str) -> Option<Product> {
        self.with_catalog(|c| c.find_by_barcode(barcode).cloned())
    }

    pub fn search(&self, query: &str) -> Vec<Product> {
        self.with_catalog(|c| c.search(query).into_iter().cloned().collect())
    }

    /// Records a completed bill on the mirror (local durability is the
    /// bill log's job, see [`crate::history`]).
    pub fn mirror_bill(&self, bill: beacon_core::types::Bill) {
        self.enqueue(MirrorOp::InsertBill(Box::new(bill)));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
