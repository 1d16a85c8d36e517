//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:  0.1 + 0.2 = 0.30000000000000004                │
//! │  In many retail systems:  R$10.00 / 3 = R$3.33 (×3 = R$9.99)        │
//! │                                                                     │
//! │  OUR SOLUTION: integer centavos                                     │
//! │    1000 centavos / 3 = 333 centavos (×3 = 999 centavos)             │
//! │    We KNOW we lost 1 centavo, and handle it explicitly              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every monetary value in the ledger flows through this type: line subtotals,
//! discounts, payments, credit balances, exchange differences, refunds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest BRL unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are meaningful for refunds and for an
///   exchange's value difference (store owes the customer)
/// - **Single-field tuple struct**: zero-cost abstraction over i64
///
/// ## Example
/// ```rust
/// use lojix_core::money::Money;
///
/// let price = Money::from_cents(1099); // R$ 10.99
/// assert_eq!(price.cents(), 1099);
/// assert_eq!(price.multiply_quantity(2).cents(), 2198);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_reais(-5, 50)` is -R$ 5.50, not -R$ 4.50.
    #[inline]
    pub const fn from_reais(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (reais) portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity (line totals: unit price × quantity).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the given basis-point fraction of this amount, rounded DOWN.
    ///
    /// Used for percentage discounts. Flooring (instead of half-up rounding)
    /// guarantees that `percent_of(bps) / base` never exceeds `bps / 10000`,
    /// so a discount validated against a ceiling can never creep past it
    /// through rounding.
    ///
    /// ## Example
    /// ```rust
    /// use lojix_core::money::Money;
    ///
    /// let base = Money::from_cents(20_000); // R$ 200.00
    /// assert_eq!(base.percent_of(1000).cents(), 2_000); // 10% = R$ 20.00
    /// ```
    pub fn percent_of(&self, bps: u32) -> Money {
        // i128 avoids overflow on large amounts
        let part = (self.0 as i128 * bps as i128) / 10_000;
        Money(part as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. Callers format user-facing currency themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R$ {}.{:02}", sign, self.reais().abs(), self.cents_part())
    }
}

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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
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
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_reais() {
        assert_eq!(Money::from_reais(10, 99).cents(), 1099);
        assert_eq!(Money::from_reais(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "R$ 10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "R$ 5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-R$ 5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "R$ 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 399]
            .iter()
            .map(|c| Money::from_cents(*c))
            .sum();
        assert_eq!(total.cents(), 749);
    }

    #[test]
    fn test_percent_of_exact() {
        let base = Money::from_cents(20_000);
        assert_eq!(base.percent_of(1000).cents(), 2_000); // 10%
        assert_eq!(base.percent_of(10_000).cents(), 20_000); // 100%
        assert_eq!(base.percent_of(0).cents(), 0);
    }

    #[test]
    fn test_percent_of_rounds_down() {
        // 50% of 3 centavos is 1.5; flooring gives 1, never 2.
        assert_eq!(Money::from_cents(3).percent_of(5000).cents(), 1);
        // 15% of 1 centavo floors to zero.
        assert_eq!(Money::from_cents(1).percent_of(1500).cents(), 0);
    }

    #[test]
    fn test_percent_never_exceeds_rate() {
        for base in 1..500i64 {
            for bps in [100u32, 825, 1500, 3333, 9999] {
                let part = Money::from_cents(base).percent_of(bps);
                // part / base <= bps / 10000, checked without division
                assert!(part.cents() * 10_000 <= base * bps as i64);
            }
        }
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
    }
}
