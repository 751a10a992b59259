//! # Parameter Repository
//!
//! Operator-editable settings (`system_parameters`). Values are stored as
//! text and validated against their declared type on every write, so a
//! read that fails to parse means someone edited the table by hand; those
//! reads log a warning and fall back to the built-in default.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use sicarga_core::naming::DEFAULT_CLIENT_CODE_PREFIX;
use sicarga_core::params::{
    self, parse_value, ALLOW_CONSOLIDATION, CLIENT_CODE_PREFIX, DEFAULT_FREIGHT_COST_CENTS,
    DEFAULT_QUOTE_VALIDITY_DAYS, FREIGHT_COST_PER_LB, QUOTE_VALIDITY_DAYS,
};
use sicarga_core::{CoreError, Money, ParameterType, ParameterValue, SystemParameter};

#[derive(Debug, Clone)]
pub struct ParameterRepository {
    pool: SqlitePool,
}

impl ParameterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ParameterRepository { pool }
    }

    pub async fn get(&self, name: &str) -> DbResult<Option<SystemParameter>> {
        let param = sqlx::query_as::<_, SystemParameter>(
            "SELECT * FROM system_parameters WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(param)
    }

    /// The parsed value, or `None` when missing or unparseable.
    pub async fn get_typed(&self, name: &str) -> DbResult<Option<ParameterValue>> {
        let Some(param) = self.get(name).await? else {
            debug!(name, "Parameter not set");
            return Ok(None);
        };

        match param.typed_value() {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(name, value = %param.value, error = %e, "Ignoring malformed parameter");
                Ok(None)
            }
        }
    }

    /// Text value, or `default` when the parameter is missing.
    pub async fn text_or(&self, name: &str, default: &str) -> DbResult<String> {
        Ok(self
            .get(name)
            .await?
            .map(|p| p.value.trim().to_string())
            .unwrap_or_else(|| default.to_string()))
    }

    pub async fn bool_or(&self, name: &str, default: bool) -> DbResult<bool> {
        Ok(self
            .get_typed(name)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(default))
    }

    // =========================================================================
    // Well-Known Parameters
    // =========================================================================

    pub async fn freight_cost_per_lb(&self) -> DbResult<Money> {
        Ok(self
            .get_typed(FREIGHT_COST_PER_LB)
            .await?
            .and_then(|v| v.as_money())
            .unwrap_or(Money::from_cents(DEFAULT_FREIGHT_COST_CENTS)))
    }

    pub async fn quote_validity_days(&self) -> DbResult<i64> {
        Ok(self
            .get_typed(QUOTE_VALIDITY_DAYS)
            .await?
            .and_then(|v| v.as_integer())
            .unwrap_or(DEFAULT_QUOTE_VALIDITY_DAYS))
    }

    pub async fn client_code_prefix(&self) -> DbResult<String> {
        let prefix = self.text_or(CLIENT_CODE_PREFIX, DEFAULT_CLIENT_CODE_PREFIX).await?;
        if prefix.is_empty() {
            return Ok(DEFAULT_CLIENT_CODE_PREFIX.to_string());
        }
        Ok(prefix)
    }

    pub async fn allow_consolidation(&self) -> DbResult<bool> {
        self.bool_or(ALLOW_CONSOLIDATION, true).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// All parameters by name.
    pub async fn list(&self) -> DbResult<Vec<SystemParameter>> {
        let params =
            sqlx::query_as::<_, SystemParameter>("SELECT * FROM system_parameters ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(params)
    }

    /// Creates or replaces a parameter after checking `value` parses as
    /// `data_type`.
    pub async fn upsert(
        &self,
        name: &str,
        data_type: ParameterType,
        value: &str,
    ) -> DbResult<SystemParameter> {
        parse_value(data_type, value).map_err(CoreError::from)?;

        let param = sqlx::query_as::<_, SystemParameter>(
            r#"
            INSERT INTO system_parameters (name, value, data_type, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (name) DO UPDATE SET
                value = excluded.value,
                data_type = excluded.data_type,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(name.trim())
        .bind(value.trim())
        .bind(data_type)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(name = %param.name, value = %param.value, "Parameter saved");
        Ok(param)
    }

    /// Changes the value of an existing parameter, keeping its type.
    pub async fn update_value(&self, name: &str, value: &str) -> DbResult<SystemParameter> {
        let current = self
            .get(name)
            .await?
            .ok_or_else(|| DbError::not_found("Parameter", name))?;

        self.upsert(name, current.data_type, value).await
    }

    /// Inserts every default parameter that does not exist yet.
    ///
    /// ## Returns
    /// Number of parameters inserted; existing values are never touched.
    pub async fn seed_defaults(&self) -> DbResult<usize> {
        let now = Utc::now();
        let mut inserted = 0;

        for (name, data_type, value) in params::defaults() {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO system_parameters (name, value, data_type, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(name)
            .bind(value)
            .bind(data_type)
            .bind(now)
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        info!(inserted, "Default parameters seeded");
        Ok(inserted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> ParameterRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().parameters()
    }

    #[tokio::test]
    async fn test_fallbacks_without_rows() {
        let repo = setup().await;
        assert_eq!(repo.freight_cost_per_lb().await.unwrap(), Money::from_cents(250));
        assert_eq!(repo.quote_validity_days().await.unwrap(), 15);
        assert_eq!(repo.client_code_prefix().await.unwrap(), "000015");
        assert!(repo.allow_consolidation().await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        let repo = setup().await;
        let first = repo.seed_defaults().await.unwrap();
        assert_eq!(first, params::defaults().len());
        assert_eq!(repo.seed_defaults().await.unwrap(), 0);
        assert_eq!(repo.list().await.unwrap().len(), first);
    }

    #[tokio::test]
    async fn test_update_value_validates_type() {
        let repo = setup().await;
        repo.seed_defaults().await.unwrap();

        let param = repo.update_value(FREIGHT_COST_PER_LB, "3.75").await.unwrap();
        assert_eq!(param.data_type, ParameterType::Float);
        assert_eq!(repo.freight_cost_per_lb().await.unwrap(), Money::from_cents(375));

        let err = repo.update_value(QUOTE_VALIDITY_DAYS, "quince").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(repo.quote_validity_days().await.unwrap(), 15);

        assert!(repo.update_value("Nope", "1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_row_falls_back() {
        let repo = setup().await;
        sqlx::query(
            "INSERT INTO system_parameters (name, value, data_type, updated_at) VALUES (?1, 'x', 'INTEGER', ?2)",
        )
        .bind(QUOTE_VALIDITY_DAYS)
        .bind(Utc::now())
        .execute(&repo.pool)
        .await
        .unwrap();

        assert_eq!(repo.get_typed(QUOTE_VALIDITY_DAYS).await.unwrap(), None);
        assert_eq!(repo.quote_validity_days().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_upsert_changes_type() {
        let repo = setup().await;
        repo.upsert(ALLOW_CONSOLIDATION, ParameterType::Boolean, "0")
            .await
            .unwrap();
        assert!(!repo.allow_consolidation().await.unwrap());

        repo.upsert(ALLOW_CONSOLIDATION, ParameterType::Boolean, "TRUE")
            .await
            .unwrap();
        assert!(repo.allow_consolidation().await.unwrap());
    }
}
