//! # Error Types
//!
//! Domain-specific error types for beacon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  beacon-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input / payment validation failures            │
//! │                                                                         │
//! │  beacon-store errors (separate crate)                                  │
//! │  └── StoreError       - Remote mirror / bill log failures              │
//! │                                                                         │
//! │  beacon-relay errors (separate crate)                                  │
//! │  └── RelayError       - Channel connect / protocol failures            │
//! │                                                                         │
//! │  A catalog lookup miss is NOT an error - it is a domain outcome that   │
//! │  triggers the add-product recovery flow.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (barcode, method, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line index does not exist in the cart.
    #[error("No cart line at index {index} (cart has {len} lines)")]
    LineOutOfBounds { index: usize, len: usize },

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {requested} milliunits exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Checkout attempted on an empty cart.
    #[error("Cannot create a bill from an empty cart")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric price string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Payment amount is zero or negative.
    #[error("Invalid payment amount: {cents} cents")]
    InvalidAmount { cents: i64 },

    /// Payment method is not in the accepted set.
    #[error("Invalid payment method: '{method}'")]
    InvalidMethod { method: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LineOutOfBounds { index: 5, len: 2 };
        assert_eq!(err.to_string(), "No cart line at index 5 (cart has 2 lines)");

        let err = ValidationError::InvalidMethod {
            method: "Bitcoin".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid payment method: 'Bitcoin'");

        let err = ValidationError::InvalidAmount { cents: 0 };
        assert_eq!(err.to_string(), "Invalid payment amount: 0 cents");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
