//! # Money
//!
//! US dollar amounts held as integer cents. A landed-cost quote stacks
//! four taxes on CIF, and each step rounds half up to the cent on its own:
//!
//! ```text
//! declared value ──┐
//!                  ├──► CIF ──► DAI, ISC, ISPC (on CIF)
//! freight ─────────┘      └───► ISV (on CIF + DAI + ISC + ISPC)
//!   chargeable lb × rate
//! ```
//!
//! JSON carries amounts as two-decimal strings (`"120.50"`), never floats.
//!
//! ```rust
//! use sicarga_core::money::Money;
//!
//! let parsed = Money::parse_decimal("valor", "120.5").unwrap();
//! assert_eq!(parsed, Money::from_cents(12_050));
//! assert_eq!(parsed.to_decimal_string(), "120.50");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::tariff::TaxRate;
use crate::validation::{format_fixed, parse_fixed, ValidationResult};

/// Narrows an i128 intermediate, pinning it to the i64 range.
pub(crate) fn clamp_to_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Multiplies and divides in i128, rounding half up (away from zero for
/// the positive amounts a quote deals with). Results past i64 saturate.
fn scale_half_up(amount: i64, numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let scaled = (amount as i128)
        .checked_mul(numerator as i128)
        .and_then(|product| product.checked_add(denominator as i128 / 2))
        .map(|rounded| rounded / denominator as i128);
    match scaled {
        Some(value) => clamp_to_i64(value),
        None if (amount < 0) != (numerator < 0) => i64::MIN,
        None => i64::MAX,
    }
}

/// An amount in US cents.
///
/// Arithmetic saturates at the i64 bounds instead of panicking; request
/// validation keeps real amounts far below them.
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

    /// Parses `"120"`, `"120.5"` or `"120.50"`.
    ///
    /// A third decimal is an error, not a rounding:
    /// ```rust
    /// use sicarga_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("valor", "2.5").unwrap().cents(), 250);
    /// assert!(Money::parse_decimal("valor", "2.505").is_err());
    /// ```
    pub fn parse_decimal(field: &str, text: &str) -> ValidationResult<Self> {
        parse_fixed(field, text, 2).map(Money)
    }

    /// `"120.50"`: the wire form.
    pub fn to_decimal_string(&self) -> String {
        format_fixed(self.0, 2)
    }

    /// Tax on this amount at `rate`, rounded half up to the cent.
    ///
    /// ```rust
    /// use sicarga_core::money::Money;
    /// use sicarga_core::tariff::TaxRate;
    ///
    /// let cif = Money::from_cents(11_250);
    /// assert_eq!(cif.calculate_tax(TaxRate::from_bps(1500)).cents(), 1688); // 16.875
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money(scale_half_up(self.0, rate.bps() as i64, 10_000))
    }

    /// This per-pound rate times a weight in hundredths of a pound.
    ///
    /// ```rust
    /// use sicarga_core::money::Money;
    ///
    /// let per_lb = Money::from_cents(250);
    /// assert_eq!(per_lb.per_hundredths(1050).cents(), 2625);
    /// assert_eq!(per_lb.per_hundredths(333).cents(), 833);
    /// ```
    pub fn per_hundredths(&self, hundredths: i64) -> Money {
        Money(scale_half_up(self.0, hundredths, 100))
    }
}

/// `$120.50`, for log lines.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal_string().strip_prefix('-') {
            Some(magnitude) => write!(f, "-${}", magnitude),
            None => write!(f, "${}", self.to_decimal_string()),
        }
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

/// Unit price times a count of identical articles.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0.saturating_mul(count))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
