//! # Money and Percentage Primitives
//!
//! Both types wrap `rust_decimal::Decimal` and serialize as decimal strings
//! (`"1250.50"`). Arithmetic is exact to 28 significant digits; rounding to
//! currency precision happens only in [`Money::to_currency`], which callers
//! invoke at the point of display or persistence.
//!
//! ## Tolerance
//!
//! Percentage totals and money reconciliations share one tolerance,
//! [`TOLERANCE`] = 0.01, applied strictly: two values agree when their
//! difference is *less than* 0.01. A percentage total of 99.99 is therefore
//! rejected and 99.995 accepted.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Shared tolerance for percentage totals and money reconciliation.
pub const TOLERANCE: Decimal = dec!(0.01);

/// Number of decimal places in a persisted currency amount.
pub const CURRENCY_DP: u32 = 2;

/// Whether two decimals agree within [`TOLERANCE`] (strict).
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < TOLERANCE
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// An exact currency amount.
///
/// Unrounded by default. Amounts produced by the distribution engine keep
/// full precision so that rounding error does not compound across many
/// recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wrap a decimal value.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse a decimal string such as `"1250.50"`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .map(Self)
            .map_err(|_| ValidationError::InvalidAmount(s.to_string()))
    }

    /// Access the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Apply a percentage multiplicatively: `self * pct / 100`. Unrounded.
    ///
    /// `None` when the share itself does not fit in a `Decimal`. An
    /// intermediate product that overflows is retried as
    /// `self / 100 * pct`.
    pub fn checked_percent(&self, pct: Percentage) -> Option<Money> {
        let pct = pct.as_decimal();
        self.0
            .checked_mul(pct)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .or_else(|| {
                self.0
                    .checked_div(Decimal::ONE_HUNDRED)
                    .and_then(|v| v.checked_mul(pct))
            })
            .map(Money)
    }

    /// Pro-rata share: `self * part / whole`. Unrounded.
    ///
    /// Returns zero when `whole` is zero and `None` on overflow. For
    /// `part <= whole` the result never exceeds `self`, so the fallback
    /// `self * (part / whole)` always fits.
    pub fn checked_pro_rata(&self, part: Decimal, whole: Decimal) -> Option<Money> {
        if whole.is_zero() {
            return Some(Money::ZERO);
        }
        self.0
            .checked_mul(part)
            .and_then(|v| v.checked_div(whole))
            .or_else(|| part.checked_div(whole).and_then(|r| self.0.checked_mul(r)))
            .map(Money)
    }

    /// `self + other`, or `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Round to currency precision (2 dp, midpoint away from zero).
    pub fn to_currency(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Round down (toward negative infinity) at currency precision.
    pub fn floor_currency(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::ToNegativeInfinity),
        )
    }

    /// One minor currency unit (0.01).
    pub fn cent() -> Money {
        Money(dec!(0.01))
    }

    /// Render with exactly two decimals, e.g. `"700.00"`.
    pub fn to_currency_string(&self) -> String {
        let mut rounded = self.to_currency().0;
        rounded.rescale(CURRENCY_DP);
        rounded.to_string()
    }

    /// Whether this amount agrees with `other` within [`TOLERANCE`].
    pub fn reconciles_with(&self, other: Money) -> bool {
        within_tolerance(self.0, other.0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// ---------------------------------------------------------------------------
// Percentage
// ---------------------------------------------------------------------------

/// A percentage value, nominally 0–100 with two-decimal precision.
///
/// Range is not enforced at construction: the configuration validator owns
/// the non-negativity and total-equals-100 rules and reports them with the
/// field that broke them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    /// Zero percent.
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);

    /// One hundred percent.
    pub const FULL: Percentage = Percentage(Decimal::ONE_HUNDRED);

    /// Wrap a decimal value.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse a decimal string such as `"33.33"`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidPercentage(s.to_string()))
    }

    /// Access the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// The percentage `part / whole * 100`. Zero when `whole` is zero,
    /// `None` on overflow.
    pub fn checked_ratio(part: Decimal, whole: Decimal) -> Option<Percentage> {
        if whole.is_zero() {
            return Some(Percentage::ZERO);
        }
        Decimal::ONE_HUNDRED
            .checked_mul(part)
            .and_then(|v| v.checked_div(whole))
            .or_else(|| {
                part.checked_div(whole)
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            })
            .map(Percentage)
    }

    /// `self + other`, clamped to the representable range.
    pub fn saturating_add(self, other: Percentage) -> Percentage {
        Percentage(self.0.saturating_add(other.0))
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percentage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Percentage {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Percentage {
    type Output = Percentage;

    fn add(self, rhs: Percentage) -> Percentage {
        Percentage(self.0 + rhs.0)
    }
}

impl Sum for Percentage {
    fn sum<I: Iterator<Item = Percentage>>(iter: I) -> Percentage {
        iter.fold(Percentage::ZERO, |acc, p| acc + p)
    }
}
