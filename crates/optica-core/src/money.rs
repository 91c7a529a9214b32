//! # Money Module
//!
//! `Money` for monetary values and `Percent` for discount percentages.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    $1,299.90 × 15% = 194.98499999999999                                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos, percentages in basis points            │
//! │    129990 × 1500 bps = 19498.5 → rounds half-up to 19499               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use optica_core::money::{Money, Percent};
//!
//! let price = Money::from_cents(129_990); // $1,299.90
//! let line = price * 2;                   // $2,599.80
//! let discount = line.percentage(Percent::from_whole(10));
//! assert_eq!(discount.cents(), 25_998);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest MXN unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never needs a checked path
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - Prices arrive from the backend as decimal text and are parsed exactly
///   with [`Money::parse_decimal`]; floats only appear at the wire edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ```rust
    /// use optica_core::money::Money;
    ///
    /// let price = Money::from_cents(129_990);
    /// assert_eq!(price.pesos(), 1299);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos * 100)
    }

    /// Parses a decimal amount such as `"1299.90"`, `"150"` or `"-5.5"`.
    ///
    /// More than two fractional digits are rounded half-up on the third.
    ///
    /// ```rust
    /// use optica_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("1299.9").unwrap().cents(), 129_990);
    /// assert_eq!(Money::parse_decimal("0.125").unwrap().cents(), 13);
    /// assert!(Money::parse_decimal("abc").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = input.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() {
            return Err(invalid("empty amount"));
        }

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };

        let mut frac_digits = frac.bytes().map(|b| (b - b'0') as i64);
        let tens = frac_digits.next().unwrap_or(0);
        let units = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().map_or(false, |d| d >= 5);

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(tens * 10 + units + i64::from(round_up)))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-peso portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount as a decimal number.
    ///
    /// Only for the JSON wire format and display; never compute with it.
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `pct` of this amount, rounded half-up to the centavo.
    ///
    /// ## Implementation
    /// `(amount * bps + 5000) / 10000`, in i128 so large carts cannot
    /// overflow. With `bps <= 10000` the result never exceeds the amount.
    ///
    /// ```rust
    /// use optica_core::money::{Money, Percent};
    ///
    /// let subtotal = Money::from_cents(25_000);
    /// assert_eq!(subtotal.percentage(Percent::from_whole(10)).cents(), 2_500);
    /// assert_eq!(subtotal.percentage(Percent::from_whole(100)), subtotal);
    /// ```
    pub fn percentage(&self, pct: Percent) -> Money {
        let amount = (self.0 as i128 * pct.bps() as i128 + 5000) / 10000;
        Money(amount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders like the es-MX currency format the front end uses: `$1,299.90`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.pesos().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}.{:02}", sign, grouped, self.centavos_part())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points, always within `[0, 10000]` (0% to 100%).
///
/// Every constructor clamps, so an out-of-range discount input can never
/// produce a negative discount or one larger than the amount it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// Upper bound in basis points (100%).
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a percentage from basis points, clamped to 100%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > Self::MAX_BPS {
            Percent(Self::MAX_BPS)
        } else {
            Percent(bps)
        }
    }

    /// Creates a percentage from a whole number (10 → 10%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        if pct >= 100 {
            Percent(Self::MAX_BPS)
        } else {
            Percent(pct * 100)
        }
    }

    /// Creates a percentage from user input, clamped to `[0, 100]`.
    ///
    /// NaN becomes 0%.
    ///
    /// ```rust
    /// use optica_core::money::Percent;
    ///
    /// assert_eq!(Percent::from_percentage(12.5).bps(), 1250);
    /// assert_eq!(Percent::from_percentage(-20.0).bps(), 0);
    /// assert_eq!(Percent::from_percentage(250.0).bps(), 10_000);
    /// assert_eq!(Percent::from_percentage(f64::NAN).bps(), 0);
    /// ```
    pub fn from_percentage(pct: f64) -> Self {
        if pct.is_nan() {
            return Percent(0);
        }
        let clamped = pct.clamp(0.0, 100.0);
        Percent((clamped * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage number (wire format and display).
    #[inline]
    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// 0%.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Percent {
    fn from(bps: u32) -> Self {
        Percent::from_bps(bps)
    }
}

/// Deserializes from basis points, clamping like every other constructor.
impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(Percent::from_bps)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
