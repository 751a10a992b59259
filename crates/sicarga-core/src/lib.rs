//! # sicarga-core: Pure Business Logic for SicargaBox
//!
//! Tariff math, landed-cost quotes, customer codes and validation for a
//! Miami → Honduras package-forwarding service. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SicargaBox Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web frontend (Next.js)                       │   │
//! │  │   Cotizador ──► Registro ──► Casillero ──► Solicitar envío      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ sicarga-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ measure │ │ tariff  │ │  quote  │ │ naming  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────────────────┐  │   │
//! │  │   │ address │ │ params  │ │  types  │ │ validation / error  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                sicarga-db (SQLite repositories)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent `Money`
//! - [`measure`] - `Weight`, `Dimensions`, volumetric weight
//! - [`tariff`] - Partidas arancelarias, `TaxRate`, courier categories
//! - [`quote`] - Landed-cost calculator
//! - [`naming`] - Client codes, short names, tracking numbers
//! - [`address`] - Mailbox address text and contact links
//! - [`params`] - Typed system parameters
//! - [`types`] - Users, clients, quotes, shipments
//! - [`validation`] - Field rules and decimal parsing
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use sicarga_core::measure::{Dimensions, Weight, WeightUnit};
//! use sicarga_core::money::Money;
//! use sicarga_core::quote::{calculate_quote, QuoteInput};
//! use sicarga_core::tariff::{TariffRates, TaxRate};
//!
//! let input = QuoteInput {
//!     declared_value: Money::parse_decimal("valor", "250").unwrap(),
//!     weight: Weight::parse("peso", "2", WeightUnit::Kg).unwrap(),
//!     dimensions: Dimensions::unit(),
//! };
//! let rates = TariffRates { dai: TaxRate::from_bps(1000), isv: TaxRate::from_bps(1500), ..Default::default() };
//!
//! let quote = calculate_quote(&input, &rates, Money::from_cents(250));
//! assert_eq!(quote.chargeable_weight.hundredths(), 441); // 2 kg = 4.41 lb
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod address;
pub mod error;
pub mod measure;
pub mod money;
pub mod naming;
pub mod params;
pub mod quote;
pub mod tariff;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use measure::{Dimensions, Weight, WeightUnit};
pub use money::Money;
pub use params::{ParameterType, ParameterValue, SystemParameter};
pub use quote::{calculate_quote, QuoteBreakdown, QuoteInput, QuoteTotals};
pub use tariff::{CourierCategory, TariffItem, TariffRates, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// How long the browser keeps a calculated quote before asking again.
pub const QUOTE_CACHE_TTL_HOURS: i64 = 24;

/// Results returned by the tariff autocomplete.
pub const AUTOCOMPLETE_LIMIT: u32 = 20;

/// Results returned by the public product search.
pub const PRODUCT_SEARCH_LIMIT: u32 = 50;
