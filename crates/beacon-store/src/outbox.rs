//! # Mirror Outbox
//!
//! Write-behind queue between local catalog mutations and the remote
//! mirror. Local writes always succeed; this processor owns the remote
//! side: bounded retries with exponential backoff, and an explicit
//! give-up notice when an op cannot be delivered.
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Outbox Processing Flow                              │
//! │                                                                         │
//! │  CatalogState.add/update/remove, bill checkout                          │
//! │       │                                                                 │
//! │       │ MirrorOp over unbounded mpsc                                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     OutboxProcessor                             │   │
//! │  │                                                                 │   │
//! │  │  1. Recv: next MirrorOp                                        │   │
//! │  │  2. Apply: mirror.insert/patch/delete                          │   │
//! │  │  3. On retryable error: exponential backoff, up to 10 attempts │   │
//! │  │  4. On permanent error or exhaustion:                          │   │
//! │  │     emit OutboxNotice::GaveUp + error log - NEVER silent       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Initial backoff: 500ms, doubling, capped at 30s                     │
//! │  • Max attempts: 10 (then surfaced and dropped)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use beacon_core::types::{Bill, Product};

use crate::error::StoreResult;
use crate::rest::{Mirror, ProductPatch};

// =============================================================================
// Constants
// =============================================================================

/// Maximum delivery attempts before an op is surfaced as given up.
pub const MAX_MIRROR_ATTEMPTS: u32 = 10;

/// First retry delay; doubles per attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Retry delay ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// =============================================================================
// Mirror Operations
// =============================================================================

/// One queued remote write.
#[derive(Debug, Clone)]
pub enum MirrorOp {
    InsertProduct(Product),
    PatchProduct { id: i64, patch: ProductPatch },
    DeleteProduct { id: i64 },
    InsertBill(Box<Bill>),
}

impl MirrorOp {
    /// Short tag for logs and notices.
    pub fn kind(&self) -> &'static str {
        match self {
            MirrorOp::InsertProduct(_) => "insert_product",
            MirrorOp::PatchProduct { .. } => "patch_product",
            MirrorOp::DeleteProduct { .. } => "delete_product",
            MirrorOp::InsertBill(_) => "insert_bill",
        }
    }
}

// =============================================================================
// Notices
// =============================================================================

/// Surfaced outbox outcomes. `GaveUp` is the data-durability signal the
/// local-first design otherwise lacks - the app shows it, not swallows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxNotice {
    /// The op reached the mirror (possibly after retries).
    Delivered { kind: &'static str, attempts: u32 },

    /// The op was abandoned after `attempts` tries.
    GaveUp {
        kind: &'static str,
        attempts: u32,
        last_error: String,
    },
}

// =============================================================================
// Outbox Processor
// =============================================================================

/// Drains queued mirror ops against the remote store.
pub struct OutboxProcessor {
    mirror: Arc<dyn Mirror>,
    ops_rx: mpsc::UnboundedReceiver<MirrorOp>,
    notice_tx: mpsc::Sender<OutboxNotice>,
    max_attempts: u32,
}

/// Handle for feeding and stopping the processor.
///
/// Dropping every clone of the op sender ends the processor's loop.
#[derive(Clone)]
pub struct OutboxHandle {
    ops_tx: mpsc::UnboundedSender<MirrorOp>,
}

impl OutboxHandle {
    /// The sender the catalog state mirrors through.
    pub fn sender(&self) -> mpsc::UnboundedSender<MirrorOp> {
        self.ops_tx.clone()
    }

    /// Queues an op directly (used for bill inserts at checkout).
    pub fn enqueue(&self, op: MirrorOp) {
        if self.ops_tx.send(op).is_err() {
            warn!("Outbox processor stopped, dropping mirror op");
        }
    }
}

impl OutboxProcessor {
    /// Creates a processor plus its handle and notice stream.
    pub fn new(mirror: Arc<dyn Mirror>) -> (Self, OutboxHandle, mpsc::Receiver<OutboxNotice>) {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::channel(100);

        let processor = OutboxProcessor {
            mirror,
            ops_rx,
            notice_tx,
            max_attempts: MAX_MIRROR_ATTEMPTS,
        };

        (processor, OutboxHandle { ops_tx }, notice_rx)
    }

    /// Overrides the attempt bound (tests use small values).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Runs until every op sender is dropped.
    pub async fn run(mut self) {
        info!("Mirror outbox processor started");

        while let Some(op) = self.ops_rx.recv().await {
            let notice = self.deliver(op).await;
            if let OutboxNotice::GaveUp {
                kind,
                attempts,
                last_error,
            } = &notice
            {
                error!(
                    kind,
                    attempts,
                    error = %last_error,
                    "Mirror write abandoned after max retries"
                );
            }
            // Receiver may be gone during shutdown; logging above suffices.
            let _ = self.notice_tx.send(notice).await;
        }

        info!("Mirror outbox processor stopped");
    }

    /// Attempts one op with bounded exponential backoff.
    async fn deliver(&self, op: MirrorOp) -> OutboxNotice {
        let kind = op.kind();
        let mut backoff = ExponentialBackoff {
            initial_interval: INITIAL_BACKOFF,
            max_interval: MAX_BACKOFF,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.apply(&op).await {
                Ok(()) => {
                    debug!(kind, attempts, "Mirror write delivered");
                    return OutboxNotice::Delivered { kind, attempts };
                }
                Err(err) if err.is_retryable() && attempts < self.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(MAX_BACKOFF);
                    warn!(
                        kind,
                        attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Mirror write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return OutboxNotice::GaveUp {
                        kind,
                        attempts,
                        last_error: err.to_string(),
                    };
                }
            }
        }
    }

    async fn apply(&self, op: &MirrorOp) -> StoreResult<()> {
        match op {
            MirrorOp::InsertProduct(product) => self.mirror.insert_product(product).await,
            MirrorOp::PatchProduct { id, patch } => self.mirror.patch_product(*id, patch).await,
            MirrorOp::DeleteProduct { id } => self.mirror.delete_product(*id).await,
            MirrorOp::InsertBill(bill) => self.mirror.insert_bill(bill).await,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
