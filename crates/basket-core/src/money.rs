//! # Money
//!
//! Every amount in a cart is a whole number of cents.
//!
//! ```text
//! unit price ──× quantity──► line total ──Σ──► total_price
//!                                                  │
//!                          coupon effects ─────────┤  percentage: bps, half up
//!                                                  ▼
//!                                    discount (capped at total_price)
//! ```
//!
//! Percentages never produce fractional cents: `percentage_bps` rounds half up
//! once, on the integer result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use ts_rs::TS;

/// An amount in cents. Serializes as a bare integer (`2700` is $27.00).
///
/// ## Example
/// ```rust
/// use basket_core::Money;
///
/// let line = Money::from_cents(1000).times(3);
/// assert_eq!(line.cents(), 3000);
/// assert_eq!(line.to_string(), "$30.00");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

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

    /// Price of `quantity` units at this unit price.
    #[inline]
    pub const fn times(&self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }

    /// `bps` basis points of this amount (1000 bps = 10%), rounded half up.
    ///
    /// ```rust
    /// use basket_core::Money;
    ///
    /// assert_eq!(Money::from_cents(3000).percentage_bps(1000).cents(), 300);
    /// // 99 × 12.5% = 12.375 → 12
    /// assert_eq!(Money::from_cents(99).percentage_bps(1250).cents(), 12);
    /// ```
    pub fn percentage_bps(&self, bps: u32) -> Money {
        let scaled = i128::from(self.0) * i128::from(bps);
        let cents = (scaled + 5_000).div_euclid(10_000);
        Money(i64::try_from(cents).unwrap_or(i64::MAX))
    }

    /// `self - other`, never below zero.
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

/// `$12.34`, `-$0.50`. Used in logs and error messages only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}
