//! # API Error Type
//!
//! Every handler returns `Result<_, ApiError>`; the error renders as
//!
//! ```text
//! HTTP 400
//! {"error": {"code": "VALIDATION_ERROR",
//!            "message": "peso must be positive",
//!            "fields": {"peso": "peso must be positive"}}}
//! ```
//!
//! ## Mapping
//! ```text
//! ValidationError ──────────────► 400 VALIDATION_ERROR
//! DbError::UniqueViolation ─────► 400 VALIDATION_ERROR
//! AuthError ────────────────────► 401 UNAUTHORIZED
//! not owner / not staff ────────► 403 FORBIDDEN
//! DbError::NotFound ────────────► 404 NOT_FOUND
//! CoreError::QuoteExpired, ─────► 409 CONFLICT
//!   InvalidQuoteStatus,
//!   InvalidStatusTransition
//! CoreError::ProhibitedItem ────► 422 UNPROCESSABLE
//! upload over the limit ────────► 413 PAYLOAD_TOO_LARGE
//! anything else ────────────────► 500 INTERNAL_ERROR (logged, body is generic)
//! ```

use std::collections::BTreeMap;

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use sicarga_core::{CoreError, ValidationError};
use sicarga_db::DbError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input; `fields` maps field name → message.
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Details are logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A validation error without a specific field.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code for the frontend.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Unprocessable(_) => "UNPROCESSABLE",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let fields = match &self {
            ApiError::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
                fields,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(err.field().to_string(), err.to_string());
        ApiError::Validation {
            message: err.to_string(),
            fields,
        }
    }
}

impl From<Vec<ValidationError>> for ApiError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let message = match errors.as_slice() {
            [only] => only.to_string(),
            _ => "Invalid input".to_string(),
        };

        let mut fields = BTreeMap::new();
        for err in &errors {
            fields
                .entry(err.field().to_string())
                .or_insert_with(|| err.to_string());
        }

        ApiError::Validation { message, fields }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::TariffItemNotFound(_) | CoreError::ClientNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CoreError::ProhibitedItem { .. } => ApiError::Unprocessable(err.to_string()),
            CoreError::QuoteExpired { .. }
            | CoreError::InvalidQuoteStatus { .. }
            | CoreError::InvalidStatusTransition { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { field, value } => ValidationError::Duplicate {
                field: field.rsplit('.').next().unwrap_or(&field).to_string(),
                value,
            }
            .into(),
            DbError::ForeignKeyViolation { .. } | DbError::ImportFailed { .. } => {
                ApiError::bad_request(err.to_string())
            }
            DbError::Domain(core) => core.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(_) => ApiError::Internal(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::bad_request(err.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let err: ApiError = vec![
            ValidationError::Required {
                field: "peso".into(),
            },
            ValidationError::MustBePositive {
                field: "valor".into(),
            },
        ]
        .into();

        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["fields"]["peso"], "peso is required");
        assert!(json["error"]["fields"]["valor"].is_string());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body_json(ApiError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["message"], "Internal server error");
        assert!(json["error"].get("fields").is_none());
    }

    #[test]
    fn test_core_error_statuses() {
        let prohibited: ApiError = CoreError::ProhibitedItem {
            item_no: "9303.00".into(),
        }
        .into();
        assert_eq!(prohibited.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let backwards: ApiError = CoreError::InvalidStatusTransition {
            from: "Entregado".into(),
            to: "En aduana".into(),
        }
        .into();
        assert_eq!(backwards.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_db_duplicate_is_bad_request() {
        let err: ApiError = DbError::duplicate("users.email", "ana@example.com").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::Validation { fields, .. } => assert!(fields.contains_key("email")),
            other => panic!("unexpected {other:?}"),
        }

        let missing: ApiError = DbError::not_found("Shipment", 9).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
