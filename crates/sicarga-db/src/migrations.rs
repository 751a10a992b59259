//! # Database Migrations
//!
//! Embedded SQL migrations for SicargaBox.
//!
//! ## Migration Set
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql   users, refresh_tokens, clients, tariff_items,
//! │                            system_parameters, quotes, quote_items,
//! │                            shipments, shipment_status_updates
//! ├── 002_tariff_fts.sql       tariff_items_fts (FTS5) + sync triggers
//! └── 003_add_indexes.sql      lookup indexes
//! ```
//!
//! Applied migrations are tracked in `_sqlx_migrations`; startup only runs
//! the ones that are new. Never edit an applied migration, add the next
//! `NNN_description.sql` instead.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded into the binary at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Applying schema migrations");
    MIGRATOR.run(pool).await?;

    info!(count = MIGRATOR.migrations.len(), "All migrations applied");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    // The bookkeeping table does not exist before the first run
    let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied.max(0) as usize))
}
