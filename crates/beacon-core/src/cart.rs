//! # Cart Module
//!
//! An ordered list of line items local to one session, with price snapshots
//! and total computation.
//!
//! ## Price Snapshot Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Price Snapshot Semantics                             │
//! │                                                                         │
//! │  Catalog: Rice @ 50.00/kg                                               │
//! │       │                                                                 │
//! │       │ add_line(rice, 2 kg)                                            │
//! │       ▼                                                                 │
//! │  CartLine { price: 50.00, quantity: 2 }   ← price FROZEN at add time   │
//! │                                                                         │
//! │  Catalog price later changes to 55.00 → the line STILL reads 50.00     │
//! │                                                                         │
//! │  Cashier manually edits the line to 45.00:                              │
//! │    original_price = Some(50.00)           ← recorded ONCE, for audit   │
//! │    price = 45.00                                                        │
//! │  A second edit to 40.00 keeps original_price = Some(50.00)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fee Direction
//! The POS cart subtracts a percentage fee (discount); the scanner's offline
//! cart adds one (tax). Both share this type; the caller picks the direction.
//! The final total is clamped at zero.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{FeeRate, Money, Quantity};
use crate::types::Product;
use crate::validation::validate_quantity_milli;
use crate::MAX_CART_LINES;

// =============================================================================
// Fee Direction
// =============================================================================

/// Whether the percentage fee is subtracted from or added to the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeDirection {
    /// `total = subtotal - fee` (POS checkout).
    Discount,
    /// `total = subtotal + fee` (scanner offline cart).
    Tax,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of a cart: a product snapshot plus a quantity.
///
/// Owned exclusively by one [`Cart`]. The unit price is captured at add time
/// and decoupled from later catalog price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog id of the product this line was created from.
    pub product_id: i64,

    pub barcode: String,

    pub name: String,

    pub unit: String,

    /// Unit price frozen at add time (or the latest manual override).
    pub price: Money,

    /// The pre-override unit price, recorded once on the first manual edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,

    pub quantity: Quantity,
}

impl CartLine {
    /// Creates a line from a catalog product, freezing its current price.
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        CartLine {
            product_id: product.id,
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            unit: product.unit.clone(),
            price: product.price,
            original_price: None,
            quantity,
        }
    }

    /// The line total: unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// The result of a totals computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Money,
    pub fee_percent: FeeRate,
    pub fee_direction: FeeDirection,
    pub fee_amount: Money,
    /// Clamped at zero when a discount exceeds the subtotal.
    pub total: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// An ordered collection of cart lines for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds a product to the cart.
    ///
    /// If a line for `product.id` already exists, its quantity accumulates;
    /// otherwise a new line is appended with the product's current price
    /// frozen as the line's unit price.
    pub fn add_line(&mut self, product: &Product, quantity: Quantity) -> CoreResult<()> {
        validate_quantity_milli(quantity.milli())?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Sets the quantity of the line at `index`.
    ///
    /// A quantity of zero or less removes the line - a line with
    /// non-positive quantity is never retained.
    pub fn set_quantity(&mut self, index: usize, quantity: Quantity) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfBounds {
                index,
                len: self.lines.len(),
            });
        }

        if !quantity.is_positive() {
            self.lines.remove(index);
            return Ok(());
        }

        validate_quantity_milli(quantity.milli())?;
        self.lines[index].quantity = quantity;
        Ok(())
    }

    /// Manually overrides the unit price of the line at `index`.
    ///
    /// The pre-override price is preserved in `original_price` the first
    /// time only, for audit/display.
    pub fn override_price(&mut self, index: usize, new_price: Money) -> CoreResult<()> {
        let len = self.lines.len();
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineOutOfBounds { index, len })?;

        if line.original_price.is_none() {
            line.original_price = Some(line.price);
        }
        line.price = new_price;
        Ok(())
    }

    /// Removes the line at `index`.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfBounds {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    /// Removes all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Computes subtotal, fee and total for the given rate and direction.
    ///
    /// `subtotal = Σ price × quantity`; `fee = subtotal × rate`;
    /// `total = subtotal ∓ fee`, clamped at zero.
    pub fn totals(&self, fee_percent: FeeRate, direction: FeeDirection) -> CartTotals {
        let subtotal = self
            .lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());

        let fee_amount = subtotal.apply_rate(fee_percent);

        let total = match direction {
            FeeDirection::Discount => (subtotal - fee_amount).clamp_at_zero(),
            FeeDirection::Tax => subtotal + fee_amount,
        };

        CartTotals {
            subtotal,
            fee_percent,
            fee_direction: direction,
            fee_amount,
            total,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> Product {
        Product::new(1, "1001", "Rice", Money::from_cents(5000), "kg", "Grains")
    }

    fn bread() -> Product {
        Product::new(7, "1007", "Bread", Money::from_cents(3000), "pcs", "Bakery")
    }

    #[test]
    fn test_add_line_accumulates_same_product() {
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::from_units(2)).unwrap();
        cart.add_line(&rice(), Quantity::from_units(3)).unwrap();
        cart.add_line(&rice(), Quantity::from_milli(500)).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.milli(), 5500);
    }

    #[test]
    fn test_add_line_freezes_price() {
        let mut cart = Cart::new();
        let mut product = rice();
        cart.add_line(&product, Quantity::one()).unwrap();

        // Catalog price changes after the add
        product.price = Money::from_cents(9999);

        assert_eq!(cart.lines()[0].price.cents(), 5000);
    }

    #[test]
    fn test_add_line_rejects_nonpositive_quantity() {
        let mut cart = Cart::new();
        assert!(cart.add_line(&rice(), Quantity::from_milli(0)).is_err());
        assert!(cart.add_line(&rice(), Quantity::from_milli(-100)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::from_units(2)).unwrap();
        cart.set_quantity(0, Quantity::from_milli(0)).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_override_price_preserves_original_once() {
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::one()).unwrap();

        cart.override_price(0, Money::from_cents(4500)).unwrap();
        assert_eq!(cart.lines()[0].price.cents(), 4500);
        assert_eq!(cart.lines()[0].original_price, Some(Money::from_cents(5000)));

        // Second edit keeps the first original
        cart.override_price(0, Money::from_cents(4000)).unwrap();
        assert_eq!(cart.lines()[0].price.cents(), 4000);
        assert_eq!(cart.lines()[0].original_price, Some(Money::from_cents(5000)));
    }

    #[test]
    fn test_totals_discount_direction() {
        // items [{price:50, qty:2}, {price:30, qty:1}], discount 10%
        // ⇒ subtotal 130.00, fee 13.00, total 117.00
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::from_units(2)).unwrap();
        cart.add_line(&bread(), Quantity::one()).unwrap();

        let totals = cart.totals(FeeRate::from_percent(10), FeeDirection::Discount);
        assert_eq!(totals.subtotal.cents(), 13000);
        assert_eq!(totals.fee_amount.cents(), 1300);
        assert_eq!(totals.total.cents(), 11700);
        assert_eq!(format!("{}", totals.total), "117.00");
    }

    #[test]
    fn test_totals_tax_direction() {
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::one()).unwrap();

        let totals = cart.totals(FeeRate::from_percent(10), FeeDirection::Tax);
        assert_eq!(totals.subtotal.cents(), 5000);
        assert_eq!(totals.fee_amount.cents(), 500);
        assert_eq!(totals.total.cents(), 5500);
    }

    #[test]
    fn test_totals_clamps_at_zero() {
        // 100% discount followed by rounding can never go below zero
        let mut cart = Cart::new();
        cart.add_line(&rice(), Quantity::one()).unwrap();

        let totals = cart.totals(FeeRate::from_bps(10000), FeeDirection::Discount);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_totals_empty_cart() {
        let cart = Cart::new();
        let totals = cart.totals(FeeRate::from_percent(10), FeeDirection::Discount);
        assert!(totals.subtotal.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_remove_line_out_of_bounds() {
        let mut cart = Cart::new();
        let err = cart.remove_line(3).unwrap_err();
        assert!(matches!(err, CoreError::LineOutOfBounds { index: 3, len: 0 }));
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            let p = Product::new(
                i as i64,
                format!("B{i}"),
                format!("P{i}"),
                Money::from_cents(100),
                "pcs",
                "Test",
            );
            cart.add_line(&p, Quantity::one()).unwrap();
        }

        let overflow = Product::new(9999, "B9999", "Over", Money::from_cents(100), "pcs", "Test");
        let err = cart.add_line(&overflow, Quantity::one()).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }
}
