//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  THE INTEGER-CENTS PROBLEM                                              │
//! │    Mozzarella at R$ 0.042 per gram has no cent representation.         │
//! │    150 g × R$ 0.042 = R$ 6.30, but 150 × 0 cents = R$ 0.00             │
//! │                                                                         │
//! │  OUR SOLUTION: Base-10 Decimal                                          │
//! │    Exact for every value an operator can type, 28 significant digits.  │
//! │    Rounding to cents happens once, when a result row is built.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use margem_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(2290); // R$ 22.90
//! let cheese = Money::new(Decimal::new(42, 3)).multiply_quantity(Decimal::from(150));
//!
//! assert_eq!(cheese, Money::from_cents(630));
//! assert_eq!((price - cheese).to_string(), "R$ 16.60");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in reais, kept at full decimal precision.
///
/// ## Design Decisions
/// - **Signed**: net margins go negative when a product sells at a loss
/// - **Unrounded**: intermediate results keep every digit; only result rows
///   are rounded (see [`Money::round_cents`])
/// - **Serialized as a string**: `"12.345"` survives JSON and CSV untouched
///
/// ## Where Money Flows
/// ```text
/// Ingredient.unit_cost ──► RecipeLine cost ──► ingredient_cost ──┐
///                                                                  ├──► total_unit_cost
/// FixedCostPool ──► allocation ──► fixed_cost_per_unit ───────────┤
///                                                                  │
/// listed_price ──► tax / commission / net revenue ────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps a decimal amount of reais.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use margem_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // R$ 10.99
    /// assert_eq!(price.to_string(), "R$ 10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Creates a Money value from whole reais.
    #[inline]
    pub fn from_reais(reais: i64) -> Self {
        Money(Decimal::from(reais))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Floors the value at zero.
    ///
    /// A discount larger than the price leaves an effective price of zero,
    /// never a negative one.
    #[inline]
    pub fn max_zero(&self) -> Self {
        Money(self.0.max(Decimal::ZERO))
    }

    /// Rounds to centavos using Bankers Rounding (round half to even).
    ///
    /// ## Bankers Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  Standard rounding always rounds 0.5 UP, causing systematic bias:  │
    /// │    0.005 → 0.01, 0.015 → 0.02, 0.025 → 0.03                        │
    /// │                                                                     │
    /// │  Bankers Rounding rounds 0.5 to nearest EVEN digit:                │
    /// │    0.005 → 0.00, 0.015 → 0.02, 0.025 → 0.02                        │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use margem_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let suggested = Money::new(Decimal::new(176470588, 7)); // 17.6470588
    /// assert_eq!(suggested.round_cents(), Money::from_cents(1765));
    /// ```
    pub fn round_cents(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// Applies a rate to this amount (tax, commission, discount share).
    ///
    /// ## Example
    /// ```rust
    /// use margem_core::money::Money;
    /// use margem_core::types::Rate;
    ///
    /// let price = Money::from_reais(20);
    /// let commission = price.percent_of(Rate::from_bps(3600)); // 36%
    /// assert_eq!(commission, Money::from_cents(720));
    /// ```
    #[inline]
    pub fn percent_of(&self, rate: Rate) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// Multiplies money by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use margem_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let per_kg = Money::from_cents(4200);
    /// let used = per_kg.multiply_quantity(Decimal::new(15, 2)); // 0.15 kg
    /// assert_eq!(used, Money::from_cents(630));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: Decimal) -> Self {
        Money(self.0 * qty)
    }

    /// Divides money by a non-zero divisor.
    ///
    /// Callers own the zero check; the pricing code clamps its divisors away
    /// from zero before getting here.
    #[inline]
    pub fn divide(&self, divisor: Decimal) -> Self {
        Money(self.0 / divisor)
    }

    /// Returns `self / whole` as a plain fraction, or zero when `whole` is zero.
    ///
    /// Used for margin percentages, where a zero price must yield 0 instead of
    /// a NaN that would poison downstream sorting.
    pub fn ratio_to(&self, whole: Money) -> Decimal {
        if whole.is_zero() {
            Decimal::ZERO
        } else {
            self.0 / whole.0
        }
    }
}

/// Rounds a fraction (margin %, share) to 4 places, i.e. hundredths of a percent.
pub fn round_ratio(ratio: Decimal) -> Decimal {
    ratio.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `R$ 12.34` (rounded for display only).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_cents().0;
        let sign = if rounded < Decimal::ZERO { "-" } else { "" };
        write!(f, "{}R$ {:.2}", sign, rounded.abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a decimal quantity.
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: Decimal) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.amount(), dec!(10.99));
        assert_eq!(Money::from_reais(7).amount(), dec!(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10.99");
        assert_eq!(Money::from_cents(500).to_string(), "R$ 5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5.50");
        assert_eq!(Money::zero().to_string(), "R$ 0.00");
        assert_eq!(Money::new(dec!(0.004)).to_string(), "R$ 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).amount(), dec!(15));
        assert_eq!((a - b).amount(), dec!(5));
        assert_eq!((-a).amount(), dec!(-10));
        assert_eq!((a * dec!(3)).amount(), dec!(30));

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total, Money::from_reais(20));
    }

    #[test]
    fn test_sub_cent_precision_is_kept() {
        let per_gram = Money::new(dec!(0.035));
        let line = per_gram.multiply_quantity(dec!(120));
        assert_eq!(line.amount(), dec!(4.200));
    }

    #[test]
    fn test_round_cents_uses_bankers_rounding() {
        assert_eq!(Money::new(dec!(0.125)).round_cents().amount(), dec!(0.12));
        assert_eq!(Money::new(dec!(0.135)).round_cents().amount(), dec!(0.14));
        assert_eq!(Money::new(dec!(17.6470)).round_cents().amount(), dec!(17.65));
    }

    #[test]
    fn test_percent_of() {
        let price = Money::from_reais(17);
        assert_eq!(price.percent_of(Rate::from_bps(2000)).amount(), dec!(3.4));
    }

    #[test]
    fn test_ratio_to_zero_whole_is_zero() {
        let margin = Money::from_reais(5);
        assert_eq!(margin.ratio_to(Money::zero()), Decimal::ZERO);
        assert_eq!(margin.ratio_to(Money::from_reais(20)), dec!(0.25));
    }

    #[test]
    fn test_max_zero() {
        assert_eq!(Money::from_reais(-3).max_zero(), Money::zero());
        assert_eq!(Money::from_reais(3).max_zero(), Money::from_reais(3));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs(), Money::from_cents(100));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(dec!(12.345))).unwrap();
        assert_eq!(json, "\"12.345\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount(), dec!(12.345));
    }
}
