//! # Domain Types
//!
//! Accounts, clients, quotes and shipments.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐  1:1  ┌─────────────────┐                             │
//! │  │    User     │──────►│     Client      │  codigo_cliente, address    │
//! │  │  login      │       │  (cliente)      │                             │
//! │  └─────────────┘       └───────┬─────────┘                             │
//! │                                │ 1:N                                    │
//! │                  ┌─────────────┴──────────────┐                        │
//! │                  ▼                            ▼                        │
//! │        ┌─────────────────┐  0..1   ┌─────────────────┐                 │
//! │        │     Quote       │◄────────│    Shipment     │                 │
//! │        │  (cotización)   │         │    (envío)      │                 │
//! │        └───────┬─────────┘         └───────┬─────────┘                 │
//! │                │ 1:N                       │ 1:N                        │
//! │                ▼                           ▼                            │
//! │        ┌─────────────────┐         ┌─────────────────┐                 │
//! │        │   QuoteItem     │         │  StatusUpdate   │                 │
//! │        │  (artículo)     │         │  (history)      │                 │
//! │        └─────────────────┘         └─────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are SQLite integer row ids; they appear in URLs such as
//! `/api/shipping/update/{id}/`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::address::compose_mailbox_address;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::measure::{Dimensions, Weight};
use crate::money::Money;
use crate::naming::full_name;
use crate::quote::QuoteBreakdown;

pub const DEFAULT_CITY: &str = "San Pedro Sula";
pub const DEFAULT_DEPARTMENT: &str = "Cortés";
pub const DEFAULT_COUNTRY: &str = "Honduras";

// =============================================================================
// User
// =============================================================================

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,

    pub is_active: bool,
    pub is_staff: bool,

    #[ts(as = "Option<String>")]
    pub last_login: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
}

// =============================================================================
// Client
// =============================================================================

/// A customer profile (cliente), owner of a mailbox code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub user_id: Option<i64>,
    pub first_names: String,
    pub last_names: String,
    pub phone: String,
    pub email: String,
    /// Label name, see [`crate::naming::short_name`].
    pub short_name: String,
    pub address: String,
    pub city: String,
    pub department: String,
    pub country: String,
    /// `{prefix}-{id:06}`; assigned right after the row is inserted.
    pub client_code: Option<String>,
    #[ts(as = "String")]
    pub registered_at: DateTime<Utc>,
}

impl Client {
    pub fn full_name(&self) -> String {
        full_name(&self.first_names, &self.last_names)
    }

    /// Mailbox address text for this client.
    pub fn mailbox_address(&self, consolidator: &str) -> String {
        compose_mailbox_address(&self.full_name(), self.client_code.as_deref(), consolidator)
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Fields needed to create a client profile.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub user_id: Option<i64>,
    pub first_names: String,
    pub last_names: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub department: String,
    pub country: String,
}

impl NewClient {
    /// Profile for a freshly registered account, with local defaults.
    pub fn for_user(user: &User) -> Self {
        NewClient {
            user_id: Some(user.id),
            first_names: user.first_name.trim().to_string(),
            last_names: user.last_name.trim().to_string(),
            phone: String::new(),
            email: user.email.clone(),
            address: String::new(),
            city: DEFAULT_CITY.to_string(),
            department: DEFAULT_DEPARTMENT.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Contact details a client may edit about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub department: Option<String>,
}

// =============================================================================
// Quote
// =============================================================================

/// Lifecycle of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum QuoteStatus {
    #[serde(rename = "Pendiente")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pendiente"))]
    Pending,
    #[serde(rename = "Aceptada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Aceptada"))]
    Accepted,
    #[serde(rename = "Expirada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Expirada"))]
    Expired,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 3] = [QuoteStatus::Pending, QuoteStatus::Accepted, QuoteStatus::Expired];

    pub fn label(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "Pendiente",
            QuoteStatus::Accepted => "Aceptada",
            QuoteStatus::Expired => "Expirada",
        }
    }

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        QuoteStatus::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(text.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "estado".to_string(),
                allowed: QuoteStatus::ALL.iter().map(|s| s.label().to_string()).collect(),
            })
    }
}

/// A quote header (cotización) with its running totals.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Quote {
    pub id: i64,
    pub client_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub status: QuoteStatus,
    pub subtotal_cents: i64,
    pub freight_cents: i64,
    pub taxes_cents: i64,
    pub total_cents: i64,
}

impl Quote {
    /// Expiry for a quote created at `created_at`.
    pub fn expiry_for(created_at: DateTime<Utc>, validity_days: i64) -> DateTime<Utc> {
        created_at + Duration::days(validity_days.max(0))
    }

    /// Status as the customer should see it: a pending quote past its
    /// expiry reads as expired even before anything rewrites the row.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuoteStatus {
        if self.status == QuoteStatus::Pending && now >= self.expires_at {
            QuoteStatus::Expired
        } else {
            self.status
        }
    }

    /// Fails unless the quote is pending and within its validity window.
    pub fn ensure_open(&self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.effective_status(now) {
            QuoteStatus::Pending => Ok(()),
            QuoteStatus::Expired => Err(CoreError::QuoteExpired {
                quote_id: self.id,
                expired_on: self.expires_at.format("%Y-%m-%d").to_string(),
            }),
            other => Err(CoreError::InvalidQuoteStatus {
                quote_id: self.id,
                current_status: other.label().to_string(),
            }),
        }
    }

    pub fn is_owned_by(&self, client_id: i64) -> bool {
        self.client_id == Some(client_id)
    }

    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn freight(&self) -> Money {
        Money::from_cents(self.freight_cents)
    }

    pub fn taxes(&self) -> Money {
        Money::from_cents(self.taxes_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An article (artículo) inside a quote, with its calculated taxes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct QuoteItem {
    pub id: i64,
    pub quote_id: i64,
    pub original_description: String,
    pub tariff_item_id: Option<i64>,
    pub declared_value_cents: i64,
    pub length_hundredths: i64,
    pub width_hundredths: i64,
    pub height_hundredths: i64,
    pub weight_hundredths: i64,
    pub volumetric_weight_hundredths: i64,
    pub freight_rate_cents: i64,
    pub freight_cents: i64,
    pub dai_cents: i64,
    pub isc_cents: i64,
    pub ispc_cents: i64,
    pub isv_cents: i64,
    pub total_tax_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl QuoteItem {
    /// Captures a calculated article for storage (id assigned on insert).
    pub fn from_breakdown(
        quote_id: i64,
        description: &str,
        tariff_item_id: Option<i64>,
        dimensions: Dimensions,
        breakdown: &QuoteBreakdown,
    ) -> Self {
        QuoteItem {
            id: 0,
            quote_id,
            original_description: description.trim().to_string(),
            tariff_item_id,
            declared_value_cents: breakdown.declared_value.cents(),
            length_hundredths: dimensions.length,
            width_hundredths: dimensions.width,
            height_hundredths: dimensions.height,
            weight_hundredths: breakdown.weight.hundredths(),
            volumetric_weight_hundredths: breakdown.volumetric_weight.hundredths(),
            freight_rate_cents: breakdown.freight_rate.cents(),
            freight_cents: breakdown.freight.cents(),
            dai_cents: breakdown.dai.cents(),
            isc_cents: breakdown.isc.cents(),
            ispc_cents: breakdown.ispc.cents(),
            isv_cents: breakdown.isv.cents(),
            total_tax_cents: breakdown.total_taxes.cents(),
            created_at: Utc::now(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(
            self.length_hundredths,
            self.width_hundredths,
            self.height_hundredths,
        )
    }

    /// Rebuilds the calculation from the stored amounts.
    pub fn to_breakdown(&self) -> QuoteBreakdown {
        let declared_value = Money::from_cents(self.declared_value_cents);
        let weight = Weight::from_hundredths(self.weight_hundredths);
        let volumetric_weight = Weight::from_hundredths(self.volumetric_weight_hundredths);
        let freight = Money::from_cents(self.freight_cents);
        let dai = Money::from_cents(self.dai_cents);
        let isc = Money::from_cents(self.isc_cents);
        let ispc = Money::from_cents(self.ispc_cents);
        let isv = Money::from_cents(self.isv_cents);
        let total_taxes = Money::from_cents(self.total_tax_cents);

        QuoteBreakdown {
            declared_value,
            weight,
            volumetric_weight,
            chargeable_weight: weight.max(volumetric_weight),
            freight_rate: Money::from_cents(self.freight_rate_cents),
            freight,
            cif_value: declared_value + freight,
            dai,
            isc,
            ispc,
            isv,
            import_duties: total_taxes - isv,
            total_taxes,
            total_charges: total_taxes + freight,
            total_with_value: declared_value + total_taxes + freight,
        }
    }
}

// =============================================================================
// Shipment Status
// =============================================================================

/// Where a package is in its Miami → Honduras journey. Declared in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ShipmentStatus {
    #[serde(rename = "Documentación Pendiente")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Documentación Pendiente"))]
    DocumentationPending,
    #[serde(rename = "Solicitado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Solicitado"))]
    Requested,
    #[serde(rename = "Recibido en Miami")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Recibido en Miami"))]
    ReceivedMiami,
    #[serde(rename = "Procesado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Procesado"))]
    Processed,
    #[serde(rename = "En tránsito a Honduras")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "En tránsito a Honduras"))]
    InTransit,
    #[serde(rename = "En aduana")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "En aduana"))]
    InCustoms,
    #[serde(rename = "Liberado de aduana")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Liberado de aduana"))]
    CustomsReleased,
    #[serde(rename = "En bodega local")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "En bodega local"))]
    LocalWarehouse,
    #[serde(rename = "Disponible para entrega")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Disponible para entrega"))]
    ReadyForDelivery,
    #[serde(rename = "Entregado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Entregado"))]
    Delivered,
}

/// Dated milestones recorded on the shipment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    ReceivedMiami,
    DepartedMiami,
    ArrivedHonduras,
    CustomsReleased,
    Delivered,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 10] = [
        ShipmentStatus::DocumentationPending,
        ShipmentStatus::Requested,
        ShipmentStatus::ReceivedMiami,
        ShipmentStatus::Processed,
        ShipmentStatus::InTransit,
        ShipmentStatus::InCustoms,
        ShipmentStatus::CustomsReleased,
        ShipmentStatus::LocalWarehouse,
        ShipmentStatus::ReadyForDelivery,
        ShipmentStatus::Delivered,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShipmentStatus::DocumentationPending => "Documentación Pendiente",
            ShipmentStatus::Requested => "Solicitado",
            ShipmentStatus::ReceivedMiami => "Recibido en Miami",
            ShipmentStatus::Processed => "Procesado",
            ShipmentStatus::InTransit => "En tránsito a Honduras",
            ShipmentStatus::InCustoms => "En aduana",
            ShipmentStatus::CustomsReleased => "Liberado de aduana",
            ShipmentStatus::LocalWarehouse => "En bodega local",
            ShipmentStatus::ReadyForDelivery => "Disponible para entrega",
            ShipmentStatus::Delivered => "Entregado",
        }
    }

    /// Parses a status label, ignoring case.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let wanted = text.trim().to_lowercase();
        ShipmentStatus::ALL
            .into_iter()
            .find(|s| s.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "estado".to_string(),
                allowed: ShipmentStatus::ALL.iter().map(|s| s.label().to_string()).collect(),
            })
    }

    /// Status of a new request: the warehouse cannot match a package
    /// without a carrier tracking number or an invoice.
    pub fn initial(has_tracking: bool, has_invoice: bool) -> Self {
        if has_tracking || has_invoice {
            ShipmentStatus::Requested
        } else {
            ShipmentStatus::DocumentationPending
        }
    }

    /// Statuses only move forward.
    pub fn can_advance_to(&self, next: ShipmentStatus) -> bool {
        next > *self
    }

    /// Fails with `InvalidStatusTransition` when `next` is not ahead of `self`.
    pub fn advance_to(&self, next: ShipmentStatus) -> CoreResult<ShipmentStatus> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                from: self.label().to_string(),
                to: next.label().to_string(),
            })
        }
    }

    pub fn milestone(&self) -> Option<Milestone> {
        match self {
            ShipmentStatus::ReceivedMiami => Some(Milestone::ReceivedMiami),
            ShipmentStatus::InTransit => Some(Milestone::DepartedMiami),
            ShipmentStatus::InCustoms => Some(Milestone::ArrivedHonduras),
            ShipmentStatus::CustomsReleased => Some(Milestone::CustomsReleased),
            ShipmentStatus::Delivered => Some(Milestone::Delivered),
            _ => None,
        }
    }
}

// =============================================================================
// Shipment
// =============================================================================

/// A shipping request (envío) for a package arriving at the Miami warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shipment {
    pub id: i64,
    pub quote_id: Option<i64>,
    pub client_id: i64,
    /// Carrier tracking number supplied by the customer (UPS, FedEx...).
    pub original_tracking_number: Option<String>,
    /// Our own `SC-…` number.
    pub internal_tracking_number: String,
    pub status: ShipmentStatus,
    pub estimated_weight_hundredths: i64,
    pub actual_weight_hundredths: Option<i64>,
    /// Path of the uploaded purchase invoice, relative to the media root.
    pub invoice_path: Option<String>,
    pub delivery_address: String,
    pub special_instructions: String,
    #[ts(as = "String")]
    pub requested_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub received_miami_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub departed_miami_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub arrived_honduras_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub customs_released_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn has_documents(&self) -> bool {
        self.original_tracking_number.is_some() || self.invoice_path.is_some()
    }

    pub fn estimated_weight(&self) -> Weight {
        Weight::from_hundredths(self.estimated_weight_hundredths)
    }
}

/// Fields needed to create a shipping request.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub quote_id: Option<i64>,
    pub client_id: i64,
    pub original_tracking_number: Option<String>,
    pub invoice_path: Option<String>,
    pub estimated_weight: Weight,
    pub delivery_address: String,
    pub special_instructions: String,
}

/// One entry of a shipment's status history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StatusUpdate {
    pub id: i64,
    pub shipment_id: i64,
    pub previous_status: Option<ShipmentStatus>,
    pub new_status: ShipmentStatus,
    pub updated_by: Option<i64>,
    pub location: String,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{calculate_quote, QuoteInput};
    use crate::tariff::{TariffRates, TaxRate};

    fn quote(status: QuoteStatus, expires_in_days: i64) -> Quote {
        let now = Utc::now();
        Quote {
            id: 7,
            client_id: Some(3),
            created_at: now,
            expires_at: now + Duration::days(expires_in_days),
            status,
            subtotal_cents: 0,
            freight_cents: 0,
            taxes_cents: 0,
            total_cents: 0,
        }
    }

    #[test]
    fn test_quote_expiry() {
        let created = Utc::now();
        assert_eq!(Quote::expiry_for(created, 15), created + Duration::days(15));

        let open = quote(QuoteStatus::Pending, 1);
        assert_eq!(open.effective_status(Utc::now()), QuoteStatus::Pending);
        assert!(open.ensure_open(Utc::now()).is_ok());

        let stale = quote(QuoteStatus::Pending, -1);
        assert_eq!(stale.effective_status(Utc::now()), QuoteStatus::Expired);
        assert!(matches!(
            stale.ensure_open(Utc::now()),
            Err(CoreError::QuoteExpired { quote_id: 7, .. })
        ));

        let accepted = quote(QuoteStatus::Accepted, -1);
        assert_eq!(accepted.effective_status(Utc::now()), QuoteStatus::Accepted);
        assert!(matches!(
            accepted.ensure_open(Utc::now()),
            Err(CoreError::InvalidQuoteStatus { .. })
        ));
    }

    #[test]
    fn test_quote_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&QuoteStatus::Accepted).unwrap(),
            "\"Aceptada\""
        );
        assert_eq!(QuoteStatus::parse("pendiente").unwrap(), QuoteStatus::Pending);
        assert!(QuoteStatus::parse("Borrador").is_err());
    }

    #[test]
    fn test_initial_shipment_status() {
        assert_eq!(
            ShipmentStatus::initial(false, false),
            ShipmentStatus::DocumentationPending
        );
        assert_eq!(ShipmentStatus::initial(true, false), ShipmentStatus::Requested);
        assert_eq!(ShipmentStatus::initial(false, true), ShipmentStatus::Requested);
    }

    #[test]
    fn test_status_only_moves_forward() {
        let s = ShipmentStatus::InCustoms;
        assert!(s.can_advance_to(ShipmentStatus::Delivered));
        assert!(!s.can_advance_to(ShipmentStatus::InCustoms));
        assert!(!s.can_advance_to(ShipmentStatus::Requested));
        assert!(matches!(
            s.advance_to(ShipmentStatus::ReceivedMiami),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_status_labels_round_trip_through_parse() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::parse(status.label()).unwrap(), status);
        }
        assert_eq!(
            ShipmentStatus::parse("en TRÁNSITO a honduras").unwrap(),
            ShipmentStatus::InTransit
        );
        assert_eq!(
            serde_json::to_string(&ShipmentStatus::DocumentationPending).unwrap(),
            "\"Documentación Pendiente\""
        );
    }

    #[test]
    fn test_milestones() {
        assert_eq!(ShipmentStatus::InTransit.milestone(), Some(Milestone::DepartedMiami));
        assert_eq!(ShipmentStatus::Processed.milestone(), None);
    }

    #[test]
    fn test_quote_item_rebuilds_breakdown() {
        let dims = Dimensions::new(1000, 800, 600);
        let breakdown = calculate_quote(
            &QuoteInput {
                declared_value: Money::from_cents(4_999),
                weight: Weight::from_hundredths(250),
                dimensions: dims,
            },
            &TariffRates {
                dai: TaxRate::from_bps(1000),
                isc: TaxRate::from_bps(500),
                ispc: TaxRate::from_bps(100),
                isv: TaxRate::from_bps(1500),
            },
            Money::from_cents(250),
        );

        let item = QuoteItem::from_breakdown(1, " Zapatos ", Some(9), dims, &breakdown);
        assert_eq!(item.original_description, "Zapatos");
        assert_eq!(item.dimensions(), dims);
        assert_eq!(item.to_breakdown(), breakdown);
    }

    #[test]
    fn test_client_mailbox_address() {
        let client = Client {
            id: 42,
            user_id: Some(5),
            first_names: "Ana".to_string(),
            last_names: "Reyes".to_string(),
            phone: String::new(),
            email: "ana@example.com".to_string(),
            short_name: "A.Reyes".to_string(),
            address: String::new(),
            city: DEFAULT_CITY.to_string(),
            department: DEFAULT_DEPARTMENT.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            client_code: Some("000015-000042".to_string()),
            registered_at: Utc::now(),
        };

        assert_eq!(
            client.mailbox_address("Doral, FL"),
            "Ana Reyes - 000015-000042\nDoral, FL"
        );
        assert!(client.is_owned_by(5));
        assert!(!client.is_owned_by(6));
    }

    #[test]
    fn test_user_hash_never_serialized() {
        let user = User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            is_staff: false,
            last_login: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(user.full_name(), "Ana Reyes");
    }
}
