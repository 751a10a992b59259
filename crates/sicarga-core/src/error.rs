//! # Domain Errors
//!
//! ```text
//! ValidationError ──► CoreError ──► DbError ──► ApiError ──► JSON body
//!   (bad input)        (broken        (sicarga-db)  (apps/api)
//!                       business rule)
//! ```
//!
//! `ValidationError::field()` names the form field so the API can return
//! `{"fields": {"peso": "peso must be positive"}}`.

use thiserror::Error;

/// A request that is well-formed but breaks a courier rule.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Tariff item not found: {0}")]
    TariffItemNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Quoting an article whose tariff line is PROHIBITED.
    #[error("Item {item_no} cannot be shipped by courier")]
    ProhibitedItem { item_no: String },

    #[error("Quote {quote_id} expired on {expired_on}")]
    QuoteExpired { quote_id: i64, expired_on: String },

    /// Accepting twice, or adding articles to an accepted quote.
    #[error("Quote {quote_id} is {current_status} and can no longer change")]
    InvalidQuoteStatus {
        quote_id: i64,
        current_status: String,
    },

    /// Shipments only move forward:
    ///
    /// ```text
    /// Entregado ──✗──► En aduana
    /// ```
    #[error("Cannot move shipment from '{from}' to '{to}'")]
    InvalidStatusTransition { from: String, to: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} needs {min} characters or more")]
    TooShort { field: String, min: usize },

    #[error("{field} allows at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must stay within {min}..={max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Unparseable decimal, malformed email, spaces in a tracking number.
    #[error("{field}: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} accepts only {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Username, email or item number already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Password confirmation differs.
    #[error("{field} does not match {other}")]
    Mismatch { field: String, other: String },
}

impl ValidationError {
    /// Key for this error in the API's `fields` map.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::MustBePositive { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. }
            | ValidationError::Mismatch { field, .. } => field,
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_messages() {
        let err = CoreError::InvalidStatusTransition {
            from: "Entregado".to_string(),
            to: "En aduana".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot move shipment from 'Entregado' to 'En aduana'"
        );

        let err = CoreError::ProhibitedItem {
            item_no: "9301.10.00".to_string(),
        };
        assert_eq!(err.to_string(), "Item 9301.10.00 cannot be shipped by courier");
    }

    #[test]
    fn test_field_messages() {
        let err = ValidationError::Required {
            field: "peso".to_string(),
        };
        assert_eq!(err.to_string(), "peso is required");
        assert_eq!(err.field(), "peso");

        let err = ValidationError::NotAllowed {
            field: "unidad_peso".to_string(),
            allowed: vec!["lb".to_string(), "kg".to_string()],
        };
        assert_eq!(err.to_string(), "unidad_peso accepts only lb, kg");
        assert_eq!(err.field(), "unidad_peso");
    }

    #[test]
    fn test_validation_wraps_transparently() {
        let err: CoreError = ValidationError::MustBePositive {
            field: "valor".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "valor must be positive");
    }
}
