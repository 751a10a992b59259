//! # Client Repository
//!
//! Customer profiles and their mailbox codes.
//!
//! ## Code Assignment
//! ```text
//! BEGIN
//!   INSERT INTO clients (...)              → id = 42
//!   UPDATE clients SET client_code = '000015-000042' WHERE id = 42
//! COMMIT
//! ```
//! The code depends on the generated id, so both statements share one
//! transaction: no reader ever sees a client without a code.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{like_pattern, Page, PageRequest};
use crate::error::{DbError, DbResult};
use sicarga_core::naming::{client_code, short_name};
use sicarga_core::{Client, ContactUpdate, NewClient};

/// Staff-side list filter.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Matches names, email, short name or client code (substring).
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Creates a client and assigns `{prefix}-{id:06}` as its code.
    ///
    /// ## Errors
    /// `UniqueViolation` on a duplicate email or a second profile for the
    /// same user.
    pub async fn create(&self, client: &NewClient, code_prefix: &str) -> DbResult<Client> {
        let mut tx = self.pool.begin().await?;

        let label = short_name(&client.first_names, &client.last_names);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO clients (
                user_id, first_names, last_names, phone, email, short_name,
                address, city, department, country, registered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING id
            "#,
        )
        .bind(client.user_id)
        .bind(client.first_names.trim())
        .bind(client.last_names.trim())
        .bind(client.phone.trim())
        .bind(client.email.trim())
        .bind(&label)
        .bind(client.address.trim())
        .bind(client.city.trim())
        .bind(client.department.trim())
        .bind(client.country.trim())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("email") => {
                DbError::duplicate("email", client.email.clone())
            }
            DbError::UniqueViolation { .. } => DbError::duplicate(
                "user_id",
                client.user_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            other => other,
        })?;

        let created = sqlx::query_as::<_, Client>(
            "UPDATE clients SET client_code = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(client_code(code_prefix, id))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            client_id = created.id,
            code = created.client_code.as_deref().unwrap_or_default(),
            "Client registered"
        );
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// The profile owned by a login account, if any.
    pub async fn get_by_user_id(&self, user_id: i64) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE client_code = ?1")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Newest first.
    pub async fn list(&self, filter: &ClientFilter, page: PageRequest) -> DbResult<Page<Client>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        debug!(search = ?search, page = page.page, "Listing clients");

        const WHERE: &str = r#"
            WHERE ?1 IS NULL
               OR first_names LIKE ?1 ESCAPE '\'
               OR last_names LIKE ?1 ESCAPE '\'
               OR email LIKE ?1 ESCAPE '\'
               OR short_name LIKE ?1 ESCAPE '\'
               OR client_code LIKE ?1 ESCAPE '\'
        "#;

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM clients {WHERE}"))
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT * FROM clients {WHERE} ORDER BY registered_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(&search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page, count, clients))
    }

    /// Applies the fields present in `update`; absent fields keep their value.
    pub async fn update_contact(&self, id: i64, update: &ContactUpdate) -> DbResult<Client> {
        let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).map(str::to_string);

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                phone = COALESCE(?2, phone),
                address = COALESCE(?3, address),
                city = COALESCE(?4, city),
                department = COALESCE(?5, department)
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(trimmed(&update.phone))
        .bind(trimmed(&update.address))
        .bind(trimmed(&update.city))
        .bind(trimmed(&update.department))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Client", id))?;

        debug!(client_id = id, "Client contact updated");
        Ok(client)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
