//! # beacon-store: Catalog, Bill History and Remote Mirror
//!
//! State management for Beacon POS, built around one contract: **local
//! in-memory state is the read-of-record for the running session; the
//! remote store is a lagging, best-effort mirror**.
//!
//! ## Module Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          beacon-store                                   │
//! │                                                                         │
//! │  catalog  ──► ProductCatalog (pure state) + CatalogState (shared,      │
//! │               write-behind via the outbox)                              │
//! │  rest     ──► Mirror trait + RestMirror reqwest client                  │
//! │  outbox   ──► OutboxProcessor: bounded retries, explicit give-up        │
//! │  history  ──► BillLog: local JSON-array append log                      │
//! │  error    ──► StoreError with is_retryable() classification             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use beacon_store::catalog::{CatalogState, ProductCatalog};
//! use beacon_store::outbox::OutboxProcessor;
//! use beacon_store::rest::RestMirror;
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let mirror = Arc::new(RestMirror::new("https://store.example.com/rest/v1", "anon-key")?);
//!
//! let catalog = ProductCatalog::load(mirror.as_ref()).await;
//! let (processor, handle, mut notices) = OutboxProcessor::new(mirror);
//! let state = CatalogState::new(catalog).with_outbox(handle.sender());
//!
//! tokio::spawn(processor.run());
//! tokio::spawn(async move {
//!     while let Some(notice) = notices.recv().await {
//!         // surface GaveUp notices to the operator
//!         let _ = notice;
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod history;
pub mod outbox;
pub mod rest;

pub use catalog::{default_catalog, CatalogState, NewProduct, ProductCatalog};
pub use error::{StoreError, StoreResult};
pub use history::BillLog;
pub use outbox::{MirrorOp, OutboxHandle, OutboxNotice, OutboxProcessor, MAX_MIRROR_ATTEMPTS};
pub use rest::{Mirror, ProductPatch, RestMirror};
