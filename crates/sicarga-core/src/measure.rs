//! # Weights and Dimensions
//!
//! Fixed-point weight and package dimensions for freight calculation.
//!
//! ## Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Weight      i64 hundredths of a pound      1250 = 12.50 lb             │
//! │  Dimensions  i64 hundredths of an inch      1000 = 10.00 in             │
//! │                                                                         │
//! │  Volumetric weight (air courier convention):                           │
//! │                                                                         │
//! │      length × width × height  (in³)                                     │
//! │      ───────────────────────────────  =  pounds                         │
//! │                 166                                                     │
//! │                                                                         │
//! │  The carrier bills whichever is larger: scale weight or volumetric.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use ts_rs::TS;

use crate::money::clamp_to_i64;
use crate::validation::{format_fixed, parse_fixed, ValidationResult};

/// Cubic inches per billable pound.
pub const VOLUMETRIC_FACTOR: i64 = 166;

/// Pounds per kilogram as a rational: 2.20462 = 220462 / 100000.
const KG_TO_LB_NUM: i128 = 220_462;
const KG_TO_LB_DEN: i128 = 100_000;

// =============================================================================
// Weight Unit
// =============================================================================

/// Unit a customer typed their weight in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WeightUnit {
    #[default]
    Lb,
    Kg,
}

// =============================================================================
// Weight
// =============================================================================

/// Weight in hundredths of a pound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Weight(hundredths)
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    /// Converts a reading in `unit` (hundredths) to pounds.
    ///
    /// ## Example
    /// ```rust
    /// use sicarga_core::measure::{Weight, WeightUnit};
    ///
    /// // 10.00 kg → 22.05 lb (22.0462 rounded)
    /// assert_eq!(Weight::from_unit(1000, WeightUnit::Kg).hundredths(), 2205);
    /// assert_eq!(Weight::from_unit(1000, WeightUnit::Lb).hundredths(), 1000);
    /// ```
    pub fn from_unit(hundredths: i64, unit: WeightUnit) -> Self {
        match unit {
            WeightUnit::Lb => Weight(hundredths),
            WeightUnit::Kg => {
                let lb = (hundredths as i128 * KG_TO_LB_NUM + KG_TO_LB_DEN / 2) / KG_TO_LB_DEN;
                Weight(clamp_to_i64(lb))
            }
        }
    }

    /// Parses decimal text (`"12.5"`) into a weight in the given unit.
    pub fn parse(field: &str, text: &str, unit: WeightUnit) -> ValidationResult<Self> {
        parse_fixed(field, text, 2).map(|h| Weight::from_unit(h, unit))
    }

    /// Two-decimal text without unit (`"12.50"`).
    pub fn to_decimal_string(&self) -> String {
        format_fixed(self.0, 2)
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0.saturating_add(other.0))
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::zero(), |acc, w| acc + w)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lb", self.to_decimal_string())
    }
}

// =============================================================================
// Dimensions
// =============================================================================

/// Package dimensions in hundredths of an inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dimensions {
    pub length: i64,
    pub width: i64,
    pub height: i64,
}

impl Dimensions {
    pub const fn new(length: i64, width: i64, height: i64) -> Self {
        Dimensions {
            length,
            width,
            height,
        }
    }

    /// A 1 × 1 × 1 inch box; used when the customer leaves the sides blank.
    pub const fn unit() -> Self {
        Dimensions::new(100, 100, 100)
    }

    /// Fills missing sides with 1 inch.
    pub fn from_optional(length: Option<i64>, width: Option<i64>, height: Option<i64>) -> Self {
        Dimensions::new(
            length.unwrap_or(100),
            width.unwrap_or(100),
            height.unwrap_or(100),
        )
    }

    /// Volume in cubic hundredths-of-an-inch; saturates when three huge
    /// sides exceed i128.
    fn volume(&self) -> i128 {
        let volume = (self.length as i128)
            .checked_mul(self.width as i128)
            .and_then(|area| area.checked_mul(self.height as i128));
        match volume {
            Some(volume) => volume,
            None if (self.length < 0) ^ (self.width < 0) ^ (self.height < 0) => i128::MIN,
            None => i128::MAX,
        }
    }

    /// Volumetric weight: `l × w × h / 166`, rounded half up to 0.01 lb.
    ///
    /// ## Example
    /// ```rust
    /// use sicarga_core::measure::Dimensions;
    ///
    /// // 12 × 12 × 12 in = 1728 in³ / 166 = 10.409… lb
    /// let dims = Dimensions::new(1200, 1200, 1200);
    /// assert_eq!(dims.volumetric_weight().hundredths(), 1041);
    /// ```
    pub fn volumetric_weight(&self) -> Weight {
        // hundredths³ → in³ is /10^6; lb → hundredths is ×100
        let divisor = VOLUMETRIC_FACTOR as i128 * 10_000;
        let rounded = self.volume().saturating_add(divisor / 2) / divisor;
        Weight::from_hundredths(clamp_to_i64(rounded))
    }

    pub fn is_positive(&self) -> bool {
        self.length > 0 && self.width > 0 && self.height > 0
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Dimensions::unit()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kg_conversion_rounds() {
        assert_eq!(Weight::from_unit(100, WeightUnit::Kg).hundredths(), 220);
        assert_eq!(Weight::from_unit(1, WeightUnit::Kg).hundredths(), 2);
        assert_eq!(Weight::from_unit(0, WeightUnit::Kg).hundredths(), 0);
    }

    #[test]
    fn test_parse_weight() {
        let w = Weight::parse("peso", "3.5", WeightUnit::Lb).unwrap();
        assert_eq!(w.hundredths(), 350);
        assert_eq!(w.to_string(), "3.50 lb");

        let kg = Weight::parse("peso", "2", WeightUnit::Kg).unwrap();
        assert_eq!(kg.hundredths(), 441);

        assert!(Weight::parse("peso", "3.555", WeightUnit::Lb).is_err());
    }

    #[test]
    fn test_volumetric_weight() {
        // 20 × 16 × 10 = 3200 in³ → 19.277 lb
        let dims = Dimensions::new(2000, 1600, 1000);
        assert_eq!(dims.volumetric_weight().hundredths(), 1928);

        // Default 1 in³ box is 0.006 lb → 0.01 lb
        assert_eq!(Dimensions::unit().volumetric_weight().hundredths(), 1);
    }

    #[test]
    fn test_oversized_inputs_saturate() {
        let side = 10_000_000_000_000;
        let dims = Dimensions::new(side, side, side);
        assert_eq!(dims.volumetric_weight().hundredths(), i64::MAX);

        let widest = Dimensions::new(i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(widest.volumetric_weight().hundredths(), i64::MAX);

        assert_eq!(Weight::from_unit(i64::MAX, WeightUnit::Kg).hundredths(), i64::MAX);

        let heavy = Weight::from_hundredths(i64::MAX);
        assert_eq!(heavy + heavy, heavy);
    }

    #[test]
    fn test_from_optional_defaults_to_one_inch() {
        let dims = Dimensions::from_optional(Some(1000), None, None);
        assert_eq!(dims, Dimensions::new(1000, 100, 100));
    }

    #[test]
    fn test_weight_sum_and_order() {
        let total: Weight = vec![Weight::from_hundredths(150), Weight::from_hundredths(250)]
            .into_iter()
            .sum();
        assert_eq!(total.hundredths(), 400);
        assert_eq!(
            Weight::from_hundredths(300).max(Weight::from_hundredths(200)),
            Weight::from_hundredths(300)
        );
    }
}
