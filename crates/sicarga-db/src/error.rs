//! # Storage Errors
//!
//! ```text
//! sqlx::Error ─────────┐
//! MigrateError ────────┼──► DbError ──► ApiError (status + code)
//! CoreError (rules) ───┘
//! ```
//!
//! SQLite reports constraint failures only as text
//! (`UNIQUE constraint failed: users.email`); the table-qualified column is
//! kept in `UniqueViolation::field` and the API strips the table part.

use sicarga_core::CoreError;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the id, or an UPDATE/DELETE matched nothing.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: String, id: String },

    /// Username, email, client code, tariff item number or tracking number
    /// already taken.
    #[error("{field} '{value}' is already registered")]
    UniqueViolation { field: String, value: String },

    #[error("Referenced row is missing: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule refused the write, e.g. a shipment moving backwards.
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Cannot open database: {0}")]
    Connection(String),

    #[error("Schema migration error: {0}")]
    Migration(String),

    #[error("SQLite rejected the statement: {0}")]
    Query(String),

    /// Tariff schedule CSV row that could not be read or converted.
    #[error("Import failed at line {line}: {message}")]
    ImportFailed { line: u64, message: String },

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Database is busy")]
    Busy,

    #[error("Unexpected storage error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// A uniqueness conflict with the offending value filled in.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// `table.column` out of a SQLite unique-constraint message.
fn constrained_column(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, column)| column.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => DbError::UniqueViolation {
                    field: constrained_column(db_err.message()),
                    value: String::new(),
                },
                ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::Query(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::Connection("pool has been closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrained_column() {
        assert_eq!(
            constrained_column("UNIQUE constraint failed: users.email"),
            "users.email"
        );
        assert_eq!(constrained_column("constraint failed"), "unknown");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_domain_error_passes_through() {
        let err: DbError = CoreError::ClientNotFound("7".to_string()).into();
        assert!(matches!(err, DbError::Domain(CoreError::ClientNotFound(_))));
        assert_eq!(
            err.to_string(),
            CoreError::ClientNotFound("7".to_string()).to_string()
        );
    }
}
