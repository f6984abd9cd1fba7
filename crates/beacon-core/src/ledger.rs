//! # Payment Ledger
//!
//! Validates and timestamps completed sales, assigning transaction ids.
//! Independent of payment-method mechanics - cash/card/UPI/online are
//! interchangeable tags as far as the ledger is concerned.
//!
//! ## Transaction Id Format
//! ```text
//! TXN-<unix millis>-<9 alphanumeric chars>
//!     └── second/ms timestamp    └── random suffix
//!
//! Uniqueness is probabilistic, not guaranteed. The bill log tolerates the
//! (astronomically rare) collision.
//! ```

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentRecord, PaymentStatus};

/// Length of the random transaction-id suffix.
const TRANSACTION_SUFFIX_LEN: usize = 9;

// =============================================================================
// Payment Ledger
// =============================================================================

/// Validates payments against a configured method set and produces
/// immutable [`PaymentRecord`]s.
#[derive(Debug, Clone)]
pub struct PaymentLedger {
    methods: Vec<PaymentMethod>,
}

impl Default for PaymentLedger {
    /// A ledger accepting every method in the closed set.
    fn default() -> Self {
        PaymentLedger {
            methods: PaymentMethod::ALL.to_vec(),
        }
    }
}

impl PaymentLedger {
    /// Creates a ledger accepting only the given methods.
    pub fn with_methods(methods: Vec<PaymentMethod>) -> Self {
        PaymentLedger { methods }
    }

    /// Validates a payment amount and method tag.
    ///
    /// ## Failure Modes
    /// - `InvalidAmount` if `amount <= 0`
    /// - `InvalidMethod` if the tag is not in the configured set
    ///
    /// ## Returns
    /// The parsed [`PaymentMethod`] on success.
    pub fn validate(&self, amount: Money, method: &str) -> ValidationResult<PaymentMethod> {
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount {
                cents: amount.cents(),
            });
        }

        let parsed = PaymentMethod::parse(method).ok_or_else(|| ValidationError::InvalidMethod {
            method: method.to_string(),
        })?;

        if !self.methods.contains(&parsed) {
            return Err(ValidationError::InvalidMethod {
                method: method.to_string(),
            });
        }

        Ok(parsed)
    }

    /// Validates and records a payment, timestamped now.
    pub fn record(&self, amount: Money, method: &str) -> ValidationResult<PaymentRecord> {
        let parsed = self.validate(amount, method)?;
        Ok(self.record_at(amount, parsed, Utc::now()))
    }

    /// Records a pre-validated payment at an explicit timestamp.
    ///
    /// Split out so tests control the clock.
    pub fn record_at(
        &self,
        amount: Money,
        method: PaymentMethod,
        timestamp: DateTime<Utc>,
    ) -> PaymentRecord {
        PaymentRecord {
            amount,
            method,
            timestamp,
            status: PaymentStatus::Completed,
            transaction_id: generate_transaction_id(timestamp),
        }
    }
}

// =============================================================================
// Transaction Id Generation
// =============================================================================

/// Generates a `TXN-<millis>-<9 alnum>` transaction id.
pub fn generate_transaction_id(at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRANSACTION_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("TXN-{}-{}", at.timestamp_millis(), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================
