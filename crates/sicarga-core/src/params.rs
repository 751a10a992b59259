//! # System Parameters
//!
//! Operator-editable settings stored as text with a declared type.
//!
//! ```text
//! nombre_parametro                      tipo_dato   valor
//! ─────────────────────────────────────  ─────────   ───────────────
//! Prefijo del Código de Cliente          STRING      000015
//! Costo Flete por Libra en USD$          FLOAT       2.5
//! Días Validez Cotización                INTEGER     15
//! Permitir Consolidación de Paquetes     BOOLEAN     true
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Well-Known Names
// =============================================================================

pub const CLIENT_CODE_PREFIX: &str = "Prefijo del Código de Cliente";
pub const FREIGHT_COST_PER_LB: &str = "Costo Flete por Libra en USD$";
pub const QUOTE_VALIDITY_DAYS: &str = "Días Validez Cotización";
pub const ALLOW_CONSOLIDATION: &str = "Permitir Consolidación de Paquetes";
pub const CONSOLIDATOR_ADDRESS: &str = "Dirección Consolidador";
pub const OFFICE_ADDRESS: &str = "Dirección Oficina";
pub const OFFICE_WHATSAPP: &str = "WhatsApp Oficina";
pub const OFFICE_PHONE: &str = "Teléfono Oficina";
pub const HOME_DELIVERY: &str = "Entrega a Domicilio";

/// Fallback freight rate, $2.50 per pound.
pub const DEFAULT_FREIGHT_COST_CENTS: i64 = 250;

/// Fallback quote validity.
pub const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 15;

/// Parameters the seeder inserts when missing.
pub fn defaults() -> Vec<(&'static str, ParameterType, &'static str)> {
    vec![
        (CLIENT_CODE_PREFIX, ParameterType::String, "000015"),
        (FREIGHT_COST_PER_LB, ParameterType::Float, "2.5"),
        (QUOTE_VALIDITY_DAYS, ParameterType::Integer, "15"),
        (ALLOW_CONSOLIDATION, ParameterType::Boolean, "true"),
        (
            CONSOLIDATOR_ADDRESS,
            ParameterType::String,
            "7801 NW 37th St, Doral, FL 33195-6503",
        ),
        (
            OFFICE_ADDRESS,
            ParameterType::String,
            "Barrio Guamilito, 6 calle, 9 y 10 avenida N.O., San Pedro Sula, Cortés",
        ),
        (OFFICE_WHATSAPP, ParameterType::String, "+504 9548-8535"),
        (OFFICE_PHONE, ParameterType::String, "+504 2550-0000"),
        (HOME_DELIVERY, ParameterType::Boolean, "true"),
    ]
}

// =============================================================================
// Types
// =============================================================================

/// Declared type of a parameter's text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
}

/// A parameter value after parsing by its declared type.
///
/// Floats are kept as fixed-point cents-style integers (`Decimal`) since
/// every FLOAT parameter in practice is a money amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Text(String),
    Integer(i64),
    /// Hundredths (`"2.5"` → 250).
    Decimal(i64),
    Boolean(bool),
}

impl ParameterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match self {
            ParameterValue::Decimal(h) => Some(Money::from_cents(*h)),
            ParameterValue::Integer(n) => Some(Money::from_cents(n * 100)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// A row of `system_parameters`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SystemParameter {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub data_type: ParameterType,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SystemParameter {
    /// Parses `value` according to `data_type`.
    ///
    /// ## Example
    /// ```rust
    /// use sicarga_core::params::{parse_value, ParameterType, ParameterValue};
    ///
    /// assert_eq!(parse_value(ParameterType::Float, "2.5").unwrap(), ParameterValue::Decimal(250));
    /// assert_eq!(parse_value(ParameterType::Boolean, "1").unwrap(), ParameterValue::Boolean(true));
    /// assert_eq!(parse_value(ParameterType::Boolean, "yes").unwrap(), ParameterValue::Boolean(false));
    /// ```
    pub fn typed_value(&self) -> ValidationResult<ParameterValue> {
        parse_value(self.data_type, &self.value)
    }
}

/// Parses parameter text by declared type.
///
/// BOOLEAN is true for `"true"` or `"1"` (any case) and false for
/// anything else.
pub fn parse_value(data_type: ParameterType, value: &str) -> ValidationResult<ParameterValue> {
    let value = value.trim();
    match data_type {
        ParameterType::String => Ok(ParameterValue::Text(value.to_string())),
        ParameterType::Integer => value
            .parse::<i64>()
            .map(ParameterValue::Integer)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "valor".to_string(),
                reason: "must be an integer".to_string(),
            }),
        ParameterType::Float => Money::parse_decimal("valor", value)
            .map(|m| ParameterValue::Decimal(m.cents())),
        ParameterType::Boolean => Ok(ParameterValue::Boolean(
            value.eq_ignore_ascii_case("true") || value == "1",
        )),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_type() {
        assert_eq!(
            parse_value(ParameterType::String, " 000015 ").unwrap().as_text(),
            Some("000015")
        );
        assert_eq!(
            parse_value(ParameterType::Integer, "15").unwrap().as_integer(),
            Some(15)
        );
        assert!(parse_value(ParameterType::Integer, "quince").is_err());
        assert_eq!(
            parse_value(ParameterType::Float, "2.75").unwrap().as_money(),
            Some(Money::from_cents(275))
        );
        assert_eq!(
            parse_value(ParameterType::Boolean, "TRUE").unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            parse_value(ParameterType::Boolean, "0").unwrap().as_bool(),
            Some(false)
        );
    }

    #[test]
    fn test_integer_reads_as_money() {
        assert_eq!(
            ParameterValue::Integer(3).as_money(),
            Some(Money::from_cents(300))
        );
        assert_eq!(ParameterValue::Boolean(true).as_money(), None);
    }

    #[test]
    fn test_defaults_parse() {
        for (name, data_type, value) in defaults() {
            assert!(
                parse_value(data_type, value).is_ok(),
                "default for {} does not parse",
                name
            );
        }
    }

    #[test]
    fn test_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ParameterType::Boolean).unwrap(),
            "\"BOOLEAN\""
        );
    }
}
