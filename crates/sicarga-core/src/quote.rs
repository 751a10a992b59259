//! # Quote Calculator
//!
//! Landed-cost estimate for a single article shipped from Miami to Honduras.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Landed Cost Calculation                             │
//! │                                                                         │
//! │  dims ──► volumetric lb ──┐                                             │
//! │                           ├──► max ──► chargeable lb                    │
//! │  scale weight (lb) ───────┘                 │                           │
//! │                                             ▼                           │
//! │                              × cost per lb = freight                    │
//! │                                             │                           │
//! │  declared value ──────────────────────────► + ──► CIF                   │
//! │                                                    │                    │
//! │                         ┌──────────────────────────┼─────────┐          │
//! │                         ▼                          ▼         ▼          │
//! │                    DAI = CIF×r              ISC = CIF×r  ISPC = CIF×r   │
//! │                         │                          │         │          │
//! │                         └───────► CIF + DAI + ISC + ISPC ◄───┘          │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                                   ISV = base × r                        │
//! │                                                                         │
//! │  total taxes = DAI + ISC + ISPC + ISV                                   │
//! │  total charges = total taxes + freight                                  │
//! │  total with value = declared + total charges                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use sicarga_core::money::Money;
//! use sicarga_core::measure::{Dimensions, Weight};
//! use sicarga_core::quote::{calculate_quote, QuoteInput};
//! use sicarga_core::tariff::{TariffRates, TaxRate};
//!
//! let input = QuoteInput {
//!     declared_value: Money::from_cents(10_000),
//!     weight: Weight::from_hundredths(500),
//!     dimensions: Dimensions::unit(),
//! };
//! let rates = TariffRates { dai: TaxRate::from_bps(1500), isv: TaxRate::from_bps(1500), ..Default::default() };
//! let quote = calculate_quote(&input, &rates, Money::from_cents(250));
//!
//! assert_eq!(quote.freight.cents(), 1250);
//! assert_eq!(quote.cif_value.cents(), 11_250);
//! ```

use serde::{Deserialize, Serialize};

use crate::measure::{Dimensions, Weight};
use crate::money::Money;
use crate::tariff::TariffRates;

// =============================================================================
// Single Article
// =============================================================================

/// What the customer tells us about the article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteInput {
    pub declared_value: Money,
    /// Scale weight, already converted to pounds.
    pub weight: Weight,
    pub dimensions: Dimensions,
}

/// Every intermediate amount of a landed-cost calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub declared_value: Money,
    pub weight: Weight,
    pub volumetric_weight: Weight,
    pub chargeable_weight: Weight,
    pub freight_rate: Money,
    pub freight: Money,
    pub cif_value: Money,
    pub dai: Money,
    pub isc: Money,
    pub ispc: Money,
    pub isv: Money,
    /// DAI + ISC + ISPC (everything except sales tax).
    pub import_duties: Money,
    pub total_taxes: Money,
    /// Taxes plus freight: what the customer pays on top of the article.
    pub total_charges: Money,
    pub total_with_value: Money,
}

/// Computes the landed cost of one article.
///
/// Each tax rounds half up to the cent on its own; ISV is computed on the
/// already-rounded CIF + DAI + ISC + ISPC.
pub fn calculate_quote(input: &QuoteInput, rates: &TariffRates, freight_rate: Money) -> QuoteBreakdown {
    let volumetric_weight = input.dimensions.volumetric_weight();
    let chargeable_weight = input.weight.max(volumetric_weight);
    let freight = freight_rate.per_hundredths(chargeable_weight.hundredths());

    let cif_value = input.declared_value + freight;

    let dai = cif_value.calculate_tax(rates.dai);
    let isc = cif_value.calculate_tax(rates.isc);
    let ispc = cif_value.calculate_tax(rates.ispc);
    let isv = (cif_value + dai + isc + ispc).calculate_tax(rates.isv);

    let total_taxes = dai + isc + ispc + isv;
    let import_duties = total_taxes - isv;
    let total_charges = total_taxes + freight;

    QuoteBreakdown {
        declared_value: input.declared_value,
        weight: input.weight,
        volumetric_weight,
        chargeable_weight,
        freight_rate,
        freight,
        cif_value,
        dai,
        isc,
        ispc,
        isv,
        import_duties,
        total_taxes,
        total_charges,
        total_with_value: input.declared_value + total_charges,
    }
}

// =============================================================================
// Consolidated Quote
// =============================================================================

/// Chargeable weight of several articles travelling in one box.
///
/// The box is billed on `max(Σ scale weights, Σ volumetric weights)`,
/// which is never more than billing each article separately.
pub fn consolidated_weight(items: &[QuoteBreakdown]) -> Weight {
    let actual: Weight = items.iter().map(|i| i.weight).sum();
    let volumetric: Weight = items.iter().map(|i| i.volumetric_weight).sum();
    actual.max(volumetric)
}

/// Freight for a consolidated box.
pub fn consolidated_freight(items: &[QuoteBreakdown], freight_rate: Money) -> Money {
    freight_rate.per_hundredths(consolidated_weight(items).hundredths())
}

/// Header totals of a multi-article quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteTotals {
    /// Sum of declared values.
    pub subtotal: Money,
    pub freight: Money,
    pub taxes: Money,
    pub total: Money,
}

impl QuoteTotals {
    /// Sums articles, charging consolidated freight when `consolidate` is set
    /// and per-article freight otherwise.
    pub fn from_items(items: &[QuoteBreakdown], freight_rate: Money, consolidate: bool) -> Self {
        let subtotal: Money = items.iter().map(|i| i.declared_value).sum();
        let taxes: Money = items.iter().map(|i| i.total_taxes).sum();
        let freight = if consolidate {
            consolidated_freight(items, freight_rate)
        } else {
            items.iter().map(|i| i.freight).sum()
        };

        QuoteTotals {
            subtotal,
            freight,
            taxes,
            total: subtotal + freight + taxes,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::TaxRate;

    fn rates(dai: u32, isc: u32, ispc: u32, isv: u32) -> TariffRates {
        TariffRates {
            dai: TaxRate::from_bps(dai),
            isc: TaxRate::from_bps(isc),
            ispc: TaxRate::from_bps(ispc),
            isv: TaxRate::from_bps(isv),
        }
    }

    fn input(value: i64, weight: i64, dims: Dimensions) -> QuoteInput {
        QuoteInput {
            declared_value: Money::from_cents(value),
            weight: Weight::from_hundredths(weight),
            dimensions: dims,
        }
    }

    #[test]
    fn test_scale_weight_quote() {
        // $100 article, 5 lb, DAI 15%, ISV 15%, $2.50/lb
        let q = calculate_quote(
            &input(10_000, 500, Dimensions::unit()),
            &rates(1500, 0, 0, 1500),
            Money::from_cents(250),
        );

        assert_eq!(q.chargeable_weight.hundredths(), 500);
        assert_eq!(q.freight.cents(), 1250); // 5 × 2.50
        assert_eq!(q.cif_value.cents(), 11_250); // 100 + 12.50
        assert_eq!(q.dai.cents(), 1688); // 16.875 → 16.88
        assert_eq!(q.isc.cents(), 0);
        assert_eq!(q.ispc.cents(), 0);
        assert_eq!(q.isv.cents(), 1941); // (112.50 + 16.88) × 15% = 19.407
        assert_eq!(q.total_taxes.cents(), 3629);
        assert_eq!(q.import_duties.cents(), 1688);
        assert_eq!(q.total_charges.cents(), 4879);
        assert_eq!(q.total_with_value.cents(), 14_879);
    }

    #[test]
    fn test_volumetric_weight_wins() {
        // 1 lb pillow in a 20 × 16 × 10 box → billed 19.28 lb
        let q = calculate_quote(
            &input(2_000, 100, Dimensions::new(2000, 1600, 1000)),
            &rates(0, 0, 0, 0),
            Money::from_cents(250),
        );

        assert_eq!(q.volumetric_weight.hundredths(), 1928);
        assert_eq!(q.chargeable_weight.hundredths(), 1928);
        assert_eq!(q.freight.cents(), 4820);
        assert_eq!(q.total_taxes, Money::zero());
        assert_eq!(q.total_with_value.cents(), 6820);
    }

    #[test]
    fn test_all_four_taxes() {
        // CIF $200, DAI 10%, ISC 10%, ISPC 5%, ISV 15%
        let q = calculate_quote(
            &input(20_000, 0, Dimensions::unit()),
            &rates(1000, 1000, 500, 1500),
            Money::zero(),
        );

        assert_eq!(q.cif_value.cents(), 20_000);
        assert_eq!(q.dai.cents(), 2000);
        assert_eq!(q.isc.cents(), 2000);
        assert_eq!(q.ispc.cents(), 1000);
        // (200 + 20 + 20 + 10) × 15% = 37.50
        assert_eq!(q.isv.cents(), 3750);
        assert_eq!(q.import_duties.cents(), 5000);
    }

    #[test]
    fn test_breakdown_invariants() {
        for (value, weight, bps) in [(1, 1, 1), (99_999, 12_345, 3250), (50_001, 777, 1)] {
            let q = calculate_quote(
                &input(value, weight, Dimensions::new(1234, 567, 890)),
                &rates(bps, bps / 2, bps / 3, 1500),
                Money::from_cents(275),
            );
            assert_eq!(q.import_duties + q.isv, q.total_taxes);
            assert_eq!(q.declared_value + q.freight + q.total_taxes, q.total_with_value);
            assert!(q.chargeable_weight >= q.weight);
            assert!(q.chargeable_weight >= q.volumetric_weight);
        }
    }

    #[test]
    fn test_consolidated_totals() {
        let rate = Money::from_cents(250);
        let no_tax = rates(0, 0, 0, 0);

        // Heavy small item + light bulky item
        let heavy = calculate_quote(&input(5_000, 1000, Dimensions::unit()), &no_tax, rate);
        let bulky = calculate_quote(&input(3_000, 100, Dimensions::new(1200, 1200, 1200)), &no_tax, rate);

        // Separately: 10 lb + 10.41 lb = 20.41 lb
        let separate = QuoteTotals::from_items(&[heavy, bulky], rate, false);
        assert_eq!(separate.freight.cents(), 2500 + 2603);

        // Together: max(11.00 actual, 10.42 volumetric) = 11 lb
        let together = QuoteTotals::from_items(&[heavy, bulky], rate, true);
        assert_eq!(consolidated_weight(&[heavy, bulky]).hundredths(), 1100);
        assert_eq!(together.freight.cents(), 2750);
        assert_eq!(together.subtotal.cents(), 8_000);
        assert_eq!(together.total.cents(), 10_750);
    }

    #[test]
    fn test_empty_quote_totals() {
        let totals = QuoteTotals::from_items(&[], Money::from_cents(250), true);
        assert_eq!(totals, QuoteTotals::default());
    }
}
