//! # User Repository
//!
//! Login accounts and the refresh-token ledger.
//!
//! ## Refresh Token Rotation
//! ```text
//! login ──► store(jti₁)                       refresh_tokens
//!                                             ┌──────┬─────────┬────────────┐
//! refresh(jti₁) ──► consume(jti₁) ✓           │ jti₁ │ user 7  │ revoked ✓  │
//!               └─► store(jti₂)               │ jti₂ │ user 7  │            │
//!                                             └──────┴─────────┴────────────┘
//! refresh(jti₁) again ──► consume(jti₁) ✗  (already revoked)
//! ```
//! `consume` is a single conditional UPDATE, so two concurrent refreshes
//! with the same token cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use sicarga_core::{NewUser, User};

/// Repository for accounts and refresh tokens.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Inserts an active account.
    ///
    /// ## Errors
    /// `UniqueViolation { field: "username" | "email" }` when taken.
    pub async fn create(&self, user: &NewUser) -> DbResult<User> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                username, email, first_name, last_name, password_hash,
                is_active, is_staff, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("email") => {
                DbError::duplicate("email", user.email.clone())
            }
            DbError::UniqueViolation { .. } => DbError::duplicate("username", user.username.clone()),
            other => other,
        })?;

        info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds an account by username, or by email ignoring case.
    ///
    /// An exact username match wins over an email match.
    pub async fn find_by_login(&self, login: &str) -> DbResult<Option<User>> {
        let login = login.trim();
        debug!(login = %login, "Looking up account");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username = ?1 OR email = ?1
            ORDER BY username = ?1 DESC
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
                .bind(username.trim())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Case-insensitive (the column is `COLLATE NOCASE`).
    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
            .bind(email.trim())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn touch_last_login(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    // =========================================================================
    // Refresh Tokens
    // =========================================================================

    /// Records an issued refresh token.
    pub async fn store_refresh_token(
        &self,
        jti: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Spends a refresh token.
    ///
    /// ## Returns
    /// * `Some(user_id)` - first use of a live token; it is now revoked
    /// * `None` - unknown, already used, revoked or expired
    pub async fn consume_refresh_token(&self, jti: &str) -> DbResult<Option<i64>> {
        let now = Utc::now();

        let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            UPDATE refresh_tokens SET revoked_at = ?2
            WHERE jti = ?1 AND revoked_at IS NULL
            RETURNING user_id, expires_at
            "#,
        )
        .bind(jti)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((user_id, expires_at)) if expires_at > now => Some(user_id),
            Some((user_id, _)) => {
                debug!(user_id, "Expired refresh token presented");
                None
            }
            None => None,
        })
    }

    /// Blacklists one token. Returns `false` if it was unknown or already revoked.
    pub async fn revoke_refresh_token(&self, jti: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?2 WHERE jti = ?1 AND revoked_at IS NULL",
        )
        .bind(jti)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_all_for_user(&self, user_id: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?2 WHERE user_id = ?1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes tokens that expired before now.
    pub async fn purge_expired_tokens(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(removed = result.rows_affected(), "Purged expired refresh tokens");
        }
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
