//! # Validation Module
//!
//! Input validation utilities for Beacon POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Input source (keyboard wedge / camera / manual entry)        │
//! │  ├── Scan-shape checks (length ≥ 5, trimmed)                           │
//! │  └── Happens in beacon-relay before anything is emitted                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  ├── Catalog mutations (name, price, barcode)                          │
//! │  └── Cart and payment inputs                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Wire payload coercion (beacon-relay protocol)                │
//! │  └── number-or-string barcodes, defaulted unit/category                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::MAX_LINE_QUANTITY_MILLI;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a catalog barcode.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 64 characters
///
/// Catalog barcodes can be short ("1001"); the ≥5-character rule applies
/// only to keyboard-wedge scan capture, not to stored products.
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity in milliunits.
///
/// ## Rules
/// - Must be positive (> 0); a line adjusted to zero is removed, never stored
/// - Must not exceed MAX_LINE_QUANTITY_MILLI (999.000 units)
pub fn validate_quantity_milli(milli: i64) -> ValidationResult<()> {
    if milli <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if milli > MAX_LINE_QUANTITY_MILLI {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY_MILLI,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, and the default for relay-registered
///   products whose payload omitted a price)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a fee rate in basis points (discount or tax).
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_fee_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "fee rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("1001").is_ok());
        assert!(validate_barcode(" 8901030865278 ").is_ok());

        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode(&"9".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Cooking Oil").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  rice ").unwrap(), "rice");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"q".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_quantity_milli() {
        assert!(validate_quantity_milli(1).is_ok());
        assert!(validate_quantity_milli(1000).is_ok());
        assert!(validate_quantity_milli(999_000).is_ok());

        assert!(validate_quantity_milli(0).is_err());
        assert!(validate_quantity_milli(-500).is_err());
        assert!(validate_quantity_milli(999_001).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(5000).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_fee_rate_bps() {
        assert!(validate_fee_rate_bps(0).is_ok());
        assert!(validate_fee_rate_bps(1000).is_ok());
        assert!(validate_fee_rate_bps(10000).is_ok());
        assert!(validate_fee_rate_bps(10001).is_err());
    }
}
