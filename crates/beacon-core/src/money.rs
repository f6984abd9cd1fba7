//! # Money Module
//!
//! Provides the `Money`, `FeeRate` and `Quantity` types for handling
//! monetary values and decimal quantities safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    $10.00 / 3 = $3.33 (×3 = $9.99)  → Lost $0.01!                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Integer Milliunits                       │
//! │    price: 5000 cents ($50.00)                                           │
//! │    quantity: 500 milliunits (0.5 kg)                                    │
//! │    line total: 5000 × 500 / 1000 = 2500 cents, exactly                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use beacon_core::money::{Money, FeeRate, Quantity};
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(5000); // $50.00
//!
//! // Weighted quantity: 2.5 kg
//! let qty = Quantity::from_milli(2500);
//! assert_eq!(price.multiply_quantity(qty).cents(), 12500);
//!
//! // 10% fee on the line total
//! let fee = price.apply_rate(FeeRate::from_percent(10));
//! assert_eq!(fee.cents(), 500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediates (a discount larger than
///   the subtotal) before the cart clamps the final total
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Why Cents?
    /// Using the smallest unit eliminates all floating-point concerns.
    /// Wire payloads, calculations, and the bill log all use cents.
    /// Only presentation converts to major units for display.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use beacon_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// A discount can mathematically exceed the subtotal; a negative amount
    /// due is never charged at the register.
    #[inline]
    pub const fn clamp_at_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Applies a fee rate (discount or tax) and returns the fee amount,
    /// rounded half-up.
    ///
    /// ## Implementation
    /// Integer math via i128 to prevent overflow on large amounts:
    /// `(amount_cents * bps + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use beacon_core::money::{Money, FeeRate};
    ///
    /// let subtotal = Money::from_cents(13000); // 130.00
    /// let fee = subtotal.apply_rate(FeeRate::from_percent(10));
    /// assert_eq!(fee.cents(), 1300); // 13.00
    /// ```
    pub fn apply_rate(&self, rate: FeeRate) -> Money {
        let fee_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(fee_cents as i64)
    }

    /// Multiplies a unit price by a quantity in milliunits, rounded half-up.
    ///
    /// ## Example
    /// ```rust
    /// use beacon_core::money::{Money, Quantity};
    ///
    /// let unit_price = Money::from_cents(6000);       // 60.00 per L
    /// let half_litre = Quantity::from_milli(500);     // 0.5 L
    /// assert_eq!(unit_price.multiply_quantity(half_litre).cents(), 3000);
    /// ```
    pub fn multiply_quantity(&self, qty: Quantity) -> Money {
        let total = (self.0 as i128 * qty.milli() as i128 + 500) / 1000;
        Money::from_cents(total as i64)
    }
}

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Presentation layers format for
/// locale/currency themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Fee Rate (basis points)
// =============================================================================

/// A percentage rate expressed in basis points (1 bps = 0.01%).
///
/// Used for both discounts and taxes; the cart decides the direction.
/// 10% = 1000 bps, 8.25% = 825 bps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct FeeRate(u32);

impl FeeRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        FeeRate(bps)
    }

    /// Creates a rate from whole percent (10 → 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        FeeRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns zero rate.
    #[inline]
    pub const fn zero() -> Self {
        FeeRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Displays the rate as a percentage, trimming trailing zeros: "10", "8.25".
impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

// =============================================================================
// Quantity (milliunits)
// =============================================================================

/// A product quantity in thousandths of a unit.
///
/// Groceries sell by decimal weight (0.5 kg, 0.25 L), so quantities cannot
/// be plain integers. Milliunits keep three decimal places exact with
/// integer arithmetic: 1 unit = 1000, 0.5 kg = 500.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from milliunits (500 = 0.5).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units (2 = 2.000).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// One whole unit.
    #[inline]
    pub const fn one() -> Self {
        Quantity(1000)
    }

    /// Returns the quantity in milliunits.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 1000
    }

    /// Checks if the quantity is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Saturating addition, used when a scan accumulates onto an existing
    /// cart line.
    #[inline]
    pub const fn saturating_add(&self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }
}

/// Displays the quantity trimming trailing zeros: "2", "0.5", "1.25".
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / 1000;
        let frac = abs % 1000;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let mut frac_str = format!("{:03}", frac);
            while frac_str.ends_with('0') {
                frac_str.pop();
            }
            write!(f, "{}{}.{}", sign, whole, frac_str)
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        let money = Money::from_major_minor(10, 99);
        assert_eq!(money.cents(), 1099);

        let negative = Money::from_major_minor(-5, 50);
        assert_eq!(negative.cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
    }

    #[test]
    fn test_apply_rate_basic() {
        // 130.00 at 10% = 13.00
        let amount = Money::from_cents(13000);
        let rate = FeeRate::from_percent(10);
        assert_eq!(amount.apply_rate(rate).cents(), 1300);
    }

    #[test]
    fn test_apply_rate_with_rounding() {
        // 10.00 at 8.25% = 0.825 → 0.83 (half-up)
        let amount = Money::from_cents(1000);
        let rate = FeeRate::from_bps(825);
        assert_eq!(amount.apply_rate(rate).cents(), 83);
    }

    #[test]
    fn test_multiply_quantity_whole() {
        let unit_price = Money::from_cents(5000);
        let total = unit_price.multiply_quantity(Quantity::from_units(2));
        assert_eq!(total.cents(), 10000);
    }

    #[test]
    fn test_multiply_quantity_fractional() {
        // 60.00/L × 0.5 L = 30.00
        let unit_price = Money::from_cents(6000);
        let total = unit_price.multiply_quantity(Quantity::from_milli(500));
        assert_eq!(total.cents(), 3000);

        // 0.99 × 0.333 = 0.32967 → 0.33 after half-up rounding at the
        // milliunit boundary (329.67 cents-milli → 330)
        let odd = Money::from_cents(99).multiply_quantity(Quantity::from_milli(333));
        assert_eq!(odd.cents(), 33);
    }

    #[test]
    fn test_clamp_at_zero() {
        assert_eq!(Money::from_cents(-50).clamp_at_zero().cents(), 0);
        assert_eq!(Money::from_cents(50).clamp_at_zero().cents(), 50);
        assert_eq!(Money::zero().clamp_at_zero().cents(), 0);
    }

    #[test]
    fn test_fee_rate_display() {
        assert_eq!(format!("{}", FeeRate::from_percent(10)), "10");
        assert_eq!(format!("{}", FeeRate::from_bps(825)), "8.25");
        assert_eq!(format!("{}", FeeRate::from_bps(850)), "8.5");
        assert_eq!(format!("{}", FeeRate::zero()), "0");
    }

    #[test]
    fn test_quantity_display() {
        assert_eq!(format!("{}", Quantity::from_units(2)), "2");
        assert_eq!(format!("{}", Quantity::from_milli(500)), "0.5");
        assert_eq!(format!("{}", Quantity::from_milli(1250)), "1.25");
        assert_eq!(format!("{}", Quantity::from_milli(1001)), "1.001");
    }

    #[test]
    fn test_quantity_accumulation() {
        let mut qty = Quantity::one();
        qty += Quantity::from_milli(500);
        assert_eq!(qty.milli(), 1500);
        assert_eq!(format!("{}", qty), "1.5");
    }
}
