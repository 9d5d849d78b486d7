//! # Money Module
//!
//! Provides the `Money` type for rental prices, discounts and payments.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is an integer count of the smallest currency unit.        │
//! │                                                                         │
//! │  Day-based promo on Rp700.000 for 7 days, pay 3:                        │
//! │    700000 × 4 / 7 = 400000   (exact, no float drift)                    │
//! │                                                                         │
//! │  When a division is inexact we round half up, once, at the end.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rentix_core::money::Money;
//!
//! let price = Money::from_minor(150_000);
//! let line = price.checked_multiply(2).unwrap();
//! assert_eq!(line.minor(), 300_000);
//! assert_eq!(line.percent(50).minor(), 150_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: arithmetic on differences stays representable
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **i128 intermediates**: ratio math never overflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity; `None` on overflow.
    #[inline]
    pub const fn checked_multiply(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts; `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Returns `numerator / denominator` of this amount, rounded half up.
    ///
    /// A zero denominator yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use rentix_core::money::Money;
    ///
    /// let base = Money::from_minor(700_000);
    /// assert_eq!(base.ratio(4, 7).minor(), 400_000);
    /// assert_eq!(Money::from_minor(10).ratio(1, 3).minor(), 3);
    /// ```
    pub fn ratio(&self, numerator: i64, denominator: i64) -> Money {
        if denominator == 0 {
            return Money::zero();
        }
        let num = self.0 as i128 * numerator as i128;
        let den = denominator as i128;
        let half = den.abs() / 2;
        let rounded = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        Money(rounded as i64)
    }

    /// Returns `percent`% of this amount, rounded half up.
    #[inline]
    pub fn percent(&self, percent: u32) -> Money {
        self.ratio(percent as i64, 100)
    }

    /// Clamps the value into `[min, max]`.
    #[inline]
    pub fn clamp_to(self, min: Money, max: Money) -> Money {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Rupiah-style display with dot thousands separators: `Rp1.250.000`.
///
/// ## Note
/// This is used for notification text. The web layer formats its own output.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp{}", sign, grouped)
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1_250_000).to_string(), "Rp1.250.000");
        assert_eq!(Money::from_minor(500).to_string(), "Rp500");
        assert_eq!(Money::from_minor(0).to_string(), "Rp0");
        assert_eq!(Money::from_minor(-75_000).to_string(), "-Rp75.000");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!(a.checked_multiply(3).unwrap().minor(), 3000);
        assert_eq!(a.checked_add(b).unwrap().minor(), 1500);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_checked_overflow() {
        let big = Money::from_minor(i64::MAX / 2);
        assert_eq!(big.checked_multiply(3), None);
        assert_eq!(big.checked_add(big).unwrap().minor(), i64::MAX - 1);
        assert_eq!(big.checked_add(Money::from_minor(i64::MAX)), None);
    }

    #[test]
    fn test_ratio_rounding() {
        // 10 × 2/3 = 6.67 → 7
        assert_eq!(Money::from_minor(10).ratio(2, 3).minor(), 7);
        // 10 × 1/4 = 2.5 → 3 (half up)
        assert_eq!(Money::from_minor(10).ratio(1, 4).minor(), 3);
        assert_eq!(Money::from_minor(10).ratio(1, 0).minor(), 0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(Money::from_minor(200_000).percent(50).minor(), 100_000);
        assert_eq!(Money::from_minor(99).percent(10).minor(), 10);
    }

    #[test]
    fn test_clamp_to() {
        let max = Money::from_minor(100);
        assert_eq!(Money::from_minor(150).clamp_to(Money::zero(), max), max);
        assert_eq!(Money::from_minor(-5).clamp_to(Money::zero(), max), Money::zero());
        assert_eq!(Money::from_minor(42).clamp_to(Money::zero(), max).minor(), 42);
    }
}
