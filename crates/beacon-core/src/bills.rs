//! # Bill Assembly
//!
//! Creates immutable [`Bill`] records from a live cart at checkout, and
//! generates bill numbers.
//!
//! ## Bill Number Format
//! ```text
//! BL20240301042        SC20240301913
//! ││└──────┘└─┘        ││
//! ││  date   3-digit   │└── scanner checkout prefix
//! ││         random    └─── (offline scanner cart)
//! │└── YYYYMMDD
//! └─── POS checkout prefix
//!
//! Bill numbers generated per session are NOT guaranteed globally unique -
//! the random 0-999 suffix per day-granularity date makes collisions a
//! tolerated best-effort property, not a hard guarantee.
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::cart::{Cart, FeeDirection};
use crate::error::{CoreError, CoreResult};
use crate::money::FeeRate;
use crate::types::{Bill, PaymentMethod};

// =============================================================================
// Bill Prefix
// =============================================================================

/// Which session role produced the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillPrefix {
    /// POS checkout ("BL").
    Pos,
    /// Scanner offline-cart checkout ("SC").
    Scanner,
}

impl BillPrefix {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BillPrefix::Pos => "BL",
            BillPrefix::Scanner => "SC",
        }
    }
}

// =============================================================================
// Bill Number Generation
// =============================================================================

/// Generates a bill number with a random 3-digit suffix.
pub fn generate_bill_id(prefix: BillPrefix, date: NaiveDate) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    bill_id_with_suffix(prefix, date, suffix)
}

/// Deterministic variant, used by tests and retry paths.
pub fn bill_id_with_suffix(prefix: BillPrefix, date: NaiveDate, suffix: u16) -> String {
    format!(
        "{}{}{:03}",
        prefix.as_str(),
        date.format("%Y%m%d"),
        suffix % 1000
    )
}

// =============================================================================
// Checkout
// =============================================================================

/// Optional customer details attached to a bill.
#[derive(Debug, Clone, Default)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Composes an immutable bill from the cart at an explicit id/timestamp.
///
/// Pure: totals are recomputed here so the bill always reflects its own
/// items, never a stale UI figure.
pub fn compose_bill(
    cart: &Cart,
    fee_percent: FeeRate,
    direction: FeeDirection,
    method: PaymentMethod,
    customer: CustomerInfo,
    bill_id: String,
    created_at: DateTime<Utc>,
) -> CoreResult<Bill> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let totals = cart.totals(fee_percent, direction);

    Ok(Bill {
        bill_id,
        items: cart.lines().to_vec(),
        subtotal: totals.subtotal,
        fee_percent: totals.fee_percent,
        fee_direction: totals.fee_direction,
        fee_amount: totals.fee_amount,
        total: totals.total,
        payment_method: method,
        customer_name: customer.name,
        customer_phone: customer.phone,
        created_at,
    })
}

/// Checkout convenience: generates the bill id and timestamps now.
pub fn checkout(
    cart: &Cart,
    prefix: BillPrefix,
    fee_percent: FeeRate,
    direction: FeeDirection,
    method: PaymentMethod,
    customer: CustomerInfo,
) -> CoreResult<Bill> {
    let now = Utc::now();
    let bill_id = generate_bill_id(prefix, now.date_naive());
    compose_bill(cart, fee_percent, direction, method, customer, bill_id, now)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, Quantity};
    use crate::types::Product;

    fn cart_with_rice() -> Cart {
        let rice = Product::new(1, "1001", "Rice", Money::from_cents(5000), "kg", "Grains");
        let mut cart = Cart::new();
        cart.add_line(&rice, Quantity::from_units(2)).unwrap();
        cart
    }

    #[test]
    fn test_bill_id_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(bill_id_with_suffix(BillPrefix::Pos, date, 42), "BL20240301042");
        assert_eq!(
            bill_id_with_suffix(BillPrefix::Scanner, date, 913),
            "SC20240301913"
        );
        // Suffix wraps into three digits
        assert_eq!(bill_id_with_suffix(BillPrefix::Pos, date, 1042), "BL20240301042");
    }

    #[test]
    fn test_generate_bill_id_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let id = generate_bill_id(BillPrefix::Scanner, date);
        assert_eq!(id.len(), 2 + 8 + 3);
        assert!(id.starts_with("SC20241231"));
        assert!(id[10..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_compose_bill_recomputes_totals() {
        let cart = cart_with_rice();
        let bill = compose_bill(
            &cart,
            FeeRate::from_percent(10),
            FeeDirection::Discount,
            PaymentMethod::Cash,
            CustomerInfo::default(),
            "BL20240301001".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(bill.subtotal.cents(), 10000);
        assert_eq!(bill.fee_amount.cents(), 1000);
        assert_eq!(bill.total.cents(), 9000);
        assert_eq!(bill.items.len(), 1);
    }

    #[test]
    fn test_compose_bill_rejects_empty_cart() {
        let cart = Cart::new();
        let err = compose_bill(
            &cart,
            FeeRate::zero(),
            FeeDirection::Discount,
            PaymentMethod::Cash,
            CustomerInfo::default(),
            "BL20240301001".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_checkout_assigns_prefixed_id() {
        let cart = cart_with_rice();
        let bill = checkout(
            &cart,
            BillPrefix::Scanner,
            FeeRate::from_percent(5),
            FeeDirection::Tax,
            PaymentMethod::Upi,
            CustomerInfo {
                name: Some("Asha".to_string()),
                phone: None,
            },
        )
        .unwrap();

        assert!(bill.bill_id.starts_with("SC"));
        assert_eq!(bill.bill_id.len(), 13);
        assert_eq!(bill.customer_name.as_deref(), Some("Asha"));
        // tax direction adds the fee
        assert_eq!(bill.total.cents(), 10500);
    }
}
