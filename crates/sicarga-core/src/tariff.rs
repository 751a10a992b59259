//! # Tariff Classification
//!
//! Partidas arancelarias: the customs tariff lines an article is classified
//! under, with the four Honduran import taxes and courier restrictions.
//!
//! ## Tariff Line Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item_no: 8471.30.00.00                                                │
//! │           ────                                                          │
//! │           chapter 8471 ──► heading 8471.30 ──► leaf 8471.30.00.00      │
//! │                                                                         │
//! │  DAI  15%   ISC 0%   ISPC 0%   ISV 15%      (stored as bps)            │
//! │                                                                         │
//! │  courier_category: ALLOWED | RESTRICTED | PROHIBITED                   │
//! │  restrictions: ["Requires import permit", ...]                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::measure::Weight;
use crate::validation::{format_fixed, parse_fixed, ValidationResult};

/// Default package type for tariff lines without a specific requirement.
pub const DEFAULT_PACKAGE_TYPE: &str = "CAJA_REGULAR";

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000.
/// The tariff schedule publishes fractions such as `0.15`; that is 1500 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a fraction between 0 and 1 (`"0.15"` → 1500 bps).
    ///
    /// ## Example
    /// ```rust
    /// use sicarga_core::tariff::TaxRate;
    ///
    /// assert_eq!(TaxRate::parse_fraction("dai", "0.15").unwrap().bps(), 1500);
    /// assert_eq!(TaxRate::parse_fraction("isv", "1").unwrap().bps(), 10000);
    /// assert!(TaxRate::parse_fraction("dai", "1.5").is_err());
    /// ```
    pub fn parse_fraction(field: &str, text: &str) -> ValidationResult<Self> {
        let bps = parse_fixed(field, text, 4)?;
        if !(0..=10_000).contains(&bps) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: 1,
            });
        }
        Ok(TaxRate(bps as u32))
    }

    /// Fraction text with at least two decimals (`"0.15"`, `"0.0825"`).
    pub fn fraction_string(&self) -> String {
        let mut text = format_fixed(self.0 as i64, 4);
        while text.ends_with('0') && text.len() > text.find('.').map_or(0, |dot| dot + 3) {
            text.pop();
        }
        text
    }

    /// Percentage text with two decimals (`"15.00"`).
    pub fn percent_string(&self) -> String {
        format_fixed(self.0 as i64, 2)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl std::ops::Add for TaxRate {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TaxRate(self.0 + other.0)
    }
}

/// The four taxes applied to an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TariffRates {
    /// Import duty, on CIF.
    pub dai: TaxRate,
    /// Selective consumption tax, on CIF.
    pub isc: TaxRate,
    /// Population security levy, on CIF.
    pub ispc: TaxRate,
    /// Sales tax, on CIF plus the three above.
    pub isv: TaxRate,
}

impl TariffRates {
    pub fn total(&self) -> TaxRate {
        self.dai + self.isc + self.ispc + self.isv
    }
}

// =============================================================================
// Courier Category
// =============================================================================

/// Whether a tariff line may travel by courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum CourierCategory {
    /// Ships normally.
    #[default]
    Allowed,
    /// Ships with permits or special handling.
    Restricted,
    /// Cannot be shipped by courier.
    Prohibited,
}

impl CourierCategory {
    pub const ALL: [CourierCategory; 3] = [
        CourierCategory::Allowed,
        CourierCategory::Restricted,
        CourierCategory::Prohibited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourierCategory::Allowed => "ALLOWED",
            CourierCategory::Restricted => "RESTRICTED",
            CourierCategory::Prohibited => "PROHIBITED",
        }
    }

    /// Parses the wire name (`"ALLOWED"`...), case-insensitively.
    pub fn parse(text: &str) -> ValidationResult<Self> {
        CourierCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(text.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "courier_category".to_string(),
                allowed: CourierCategory::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Tariff Item
// =============================================================================

/// A partida arancelaria.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TariffItem {
    pub id: i64,

    /// Tariff line number, unique (e.g. `8471.30.00.00`).
    pub item_no: String,

    pub description: String,

    /// Official tariff heading as printed on customs forms.
    pub tariff_code: String,

    pub dai_bps: u32,
    pub isc_bps: u32,
    pub ispc_bps: u32,
    pub isv_bps: u32,

    pub courier_category: CourierCategory,

    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub restrictions: Vec<String>,

    pub package_type: String,

    /// Courier weight ceiling for this line, hundredths of a pound.
    pub max_weight_hundredths: Option<i64>,

    pub requires_special_handling: bool,

    pub special_instructions: String,

    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub search_keywords: Vec<String>,

    pub chapter_code: Option<String>,
    pub heading_code: Option<String>,

    /// item_no of the parent line in the schedule, if any.
    pub parent_code: Option<String>,
    pub hierarchy_level: i64,
    pub is_leaf: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TariffItem {
    /// Creates a leaf line with hierarchy fields derived from `item_no`.
    pub fn new(item_no: impl Into<String>, description: impl Into<String>, rates: TariffRates) -> Self {
        let item_no = item_no.into();
        let hierarchy = derive_hierarchy(&item_no);
        let now = Utc::now();
        TariffItem {
            id: 0,
            tariff_code: item_no.clone(),
            item_no,
            description: description.into(),
            dai_bps: rates.dai.bps(),
            isc_bps: rates.isc.bps(),
            ispc_bps: rates.ispc.bps(),
            isv_bps: rates.isv.bps(),
            courier_category: CourierCategory::Allowed,
            restrictions: Vec::new(),
            package_type: DEFAULT_PACKAGE_TYPE.to_string(),
            max_weight_hundredths: None,
            requires_special_handling: false,
            special_instructions: String::new(),
            search_keywords: Vec::new(),
            chapter_code: hierarchy.chapter_code,
            heading_code: hierarchy.heading_code,
            parent_code: None,
            hierarchy_level: hierarchy.level,
            is_leaf: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rates(&self) -> TariffRates {
        TariffRates {
            dai: TaxRate::from_bps(self.dai_bps),
            isc: TaxRate::from_bps(self.isc_bps),
            ispc: TaxRate::from_bps(self.ispc_bps),
            isv: TaxRate::from_bps(self.isv_bps),
        }
    }

    /// Sum of the four rates (a rough "how taxed is this" indicator).
    pub fn total_rate(&self) -> TaxRate {
        self.rates().total()
    }

    pub fn is_courier_safe(&self) -> bool {
        self.courier_category == CourierCategory::Allowed
    }

    pub fn max_weight(&self) -> Option<Weight> {
        self.max_weight_hundredths.map(Weight::from_hundredths)
    }

    /// Label used in dropdowns: `"Laptops [30.00%]"`.
    pub fn display_label(&self) -> String {
        format!("{} [{}%]", self.description, self.total_rate().percent_string())
    }

    /// Autocomplete label: `"8471.30.00.00 - Laptops"`.
    pub fn autocomplete_label(&self) -> String {
        format!("{} - {}", self.item_no, self.description)
    }

    pub fn shipping_requirements(&self) -> ShippingRequirements {
        ShippingRequirements {
            courier_category: self.courier_category,
            restrictions: self.restrictions.clone(),
            package_type: self.package_type.clone(),
            max_weight: self.max_weight().map(|w| w.to_decimal_string()),
            requires_special_handling: self.requires_special_handling,
            special_instructions: self.special_instructions.clone(),
        }
    }
}

/// What the warehouse needs to know before accepting a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingRequirements {
    pub courier_category: CourierCategory,
    pub restrictions: Vec<String>,
    pub package_type: String,
    pub max_weight: Option<String>,
    pub requires_special_handling: bool,
    pub special_instructions: String,
}

// =============================================================================
// Hierarchy
// =============================================================================

/// Chapter/heading codes derived from a tariff line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub chapter_code: Option<String>,
    pub heading_code: Option<String>,
    pub level: i64,
}

/// Derives chapter (`8471`) and heading (`8471.30`) from an item number.
///
/// ## Example
/// ```rust
/// use sicarga_core::tariff::derive_hierarchy;
///
/// let h = derive_hierarchy("8471.30.00.00");
/// assert_eq!(h.chapter_code.as_deref(), Some("8471"));
/// assert_eq!(h.heading_code.as_deref(), Some("8471.30"));
/// assert_eq!(h.level, 4);
/// ```
pub fn derive_hierarchy(item_no: &str) -> Hierarchy {
    let digits: String = item_no.chars().filter(|c| c.is_ascii_digit()).collect();

    let chapter_code = (digits.len() >= 4).then(|| digits[..4].to_string());
    let heading_code = (digits.len() >= 6).then(|| format!("{}.{}", &digits[..4], &digits[4..6]));
    let level = item_no
        .split('.')
        .filter(|group| !group.trim().is_empty())
        .count() as i64;

    Hierarchy {
        chapter_code,
        heading_code,
        level,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> TariffItem {
        TariffItem::new(
            "8471.30.00.00",
            "Laptops",
            TariffRates {
                dai: TaxRate::from_bps(1500),
                isc: TaxRate::zero(),
                ispc: TaxRate::zero(),
                isv: TaxRate::from_bps(1500),
            },
        )
    }

    #[test]
    fn test_rate_strings() {
        assert_eq!(TaxRate::from_bps(1500).fraction_string(), "0.15");
        assert_eq!(TaxRate::from_bps(825).fraction_string(), "0.0825");
        assert_eq!(TaxRate::zero().fraction_string(), "0.00");
        assert_eq!(TaxRate::from_bps(10000).fraction_string(), "1.00");
        assert_eq!(TaxRate::from_bps(1500).percent_string(), "15.00");
        assert_eq!(TaxRate::from_bps(825).percent_string(), "8.25");
    }

    #[test]
    fn test_parse_fraction_range() {
        assert_eq!(TaxRate::parse_fraction("dai", "0").unwrap(), TaxRate::zero());
        assert!(matches!(
            TaxRate::parse_fraction("dai", "-0.1"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(TaxRate::parse_fraction("dai", "0.12345").is_err());
    }

    #[test]
    fn test_display_label() {
        assert_eq!(laptop().display_label(), "Laptops [30.00%]");
        assert_eq!(laptop().autocomplete_label(), "8471.30.00.00 - Laptops");
    }

    #[test]
    fn test_courier_category_parse() {
        assert_eq!(
            CourierCategory::parse("restricted").unwrap(),
            CourierCategory::Restricted
        );
        assert!(CourierCategory::parse("MAYBE").is_err());
        assert_eq!(
            serde_json::to_string(&CourierCategory::Prohibited).unwrap(),
            "\"PROHIBITED\""
        );
    }

    #[test]
    fn test_hierarchy_short_codes() {
        let h = derive_hierarchy("01");
        assert_eq!(h.chapter_code, None);
        assert_eq!(h.heading_code, None);
        assert_eq!(h.level, 1);

        let h = derive_hierarchy("0101.2");
        assert_eq!(h.chapter_code.as_deref(), Some("0101"));
        assert_eq!(h.heading_code, None);
    }

    #[test]
    fn test_requirements_and_safety() {
        let mut item = laptop();
        assert!(item.is_courier_safe());

        item.courier_category = CourierCategory::Restricted;
        item.max_weight_hundredths = Some(5000);
        item.restrictions = vec!["Requires import permit".to_string()];

        let req = item.shipping_requirements();
        assert!(!item.is_courier_safe());
        assert_eq!(req.max_weight.as_deref(), Some("50.00"));
        assert_eq!(req.restrictions.len(), 1);
    }
}
