//! # Shipment Repository
//!
//! Shipping requests (envíos) and their status history.
//!
//! ## Lifecycle
//! ```text
//!  create ──► Documentación Pendiente ──attach_documents──► Solicitado
//!        └──► Solicitado (tracking or invoice given up front)
//!                         │
//!                         ▼ advance_status (staff, forward only)
//!  Recibido en Miami ► Procesado ► En tránsito ► En aduana ► Liberado
//!        ► En bodega local ► Disponible para entrega ► Entregado
//! ```
//! Every status change writes a `shipment_status_updates` row in the same
//! transaction as the shipment update.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use super::{Page, PageRequest};
use crate::error::{DbError, DbResult};
use sicarga_core::naming::generate_tracking_number;
use sicarga_core::types::Milestone;
use sicarga_core::{CoreError, NewShipment, Shipment, ShipmentStatus, StatusUpdate, ValidationError};

/// Tracking number collisions before giving up.
const TRACKING_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShipmentFilter {
    pub client_id: Option<i64>,
    pub status: Option<ShipmentStatus>,
}

/// A staff status update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ShipmentStatus,
    pub location: String,
    pub notes: String,
    /// Scale weight, when the package is weighed at this step.
    pub actual_weight_hundredths: Option<i64>,
    pub updated_by: Option<i64>,
}

impl StatusChange {
    pub fn new(status: ShipmentStatus) -> Self {
        StatusChange {
            status,
            location: String::new(),
            notes: String::new(),
            actual_weight_hundredths: None,
            updated_by: None,
        }
    }
}

fn milestone_column(milestone: Milestone) -> &'static str {
    match milestone {
        Milestone::ReceivedMiami => "received_miami_at",
        Milestone::DepartedMiami => "departed_miami_at",
        Milestone::ArrivedHonduras => "arrived_honduras_at",
        Milestone::CustomsReleased => "customs_released_at",
        Milestone::Delivered => "delivered_at",
    }
}

/// One history row about to be written.
struct HistoryEntry<'a> {
    shipment_id: i64,
    previous: Option<ShipmentStatus>,
    next: ShipmentStatus,
    updated_by: Option<i64>,
    location: &'a str,
    notes: &'a str,
    at: DateTime<Utc>,
}

async fn record_history(
    tx: &mut Transaction<'static, Sqlite>,
    entry: HistoryEntry<'_>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shipment_status_updates (
            shipment_id, previous_status, new_status, updated_by, location, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(entry.shipment_id)
    .bind(entry.previous)
    .bind(entry.next)
    .bind(entry.updated_by)
    .bind(entry.location.trim())
    .bind(entry.notes.trim())
    .bind(entry.at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn fetch_for_update(
    tx: &mut Transaction<'static, Sqlite>,
    id: i64,
) -> DbResult<Shipment> {
    sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DbError::not_found("Shipment", id))
}

#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    /// Creates a shipping request with a fresh `SC-…` number.
    ///
    /// ## What This Does
    /// 1. Picks the initial status from the documents supplied
    /// 2. Inserts the row, drawing a new tracking number on collision
    /// 3. Records the first history entry
    pub async fn create(&self, shipment: &NewShipment, created_by: Option<i64>) -> DbResult<Shipment> {
        let status = ShipmentStatus::initial(
            shipment.original_tracking_number.is_some(),
            shipment.invoice_path.is_some(),
        );
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let mut created = None;

        for attempt in 1..=TRACKING_ATTEMPTS {
            let tracking = generate_tracking_number();

            let result = sqlx::query_as::<_, Shipment>(
                r#"
                INSERT INTO shipments (
                    quote_id, client_id, original_tracking_number, internal_tracking_number,
                    status, estimated_weight_hundredths, invoice_path, delivery_address,
                    special_instructions, requested_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                RETURNING *
                "#,
            )
            .bind(shipment.quote_id)
            .bind(shipment.client_id)
            .bind(&shipment.original_tracking_number)
            .bind(&tracking)
            .bind(status)
            .bind(shipment.estimated_weight.hundredths())
            .bind(&shipment.invoice_path)
            .bind(shipment.delivery_address.trim())
            .bind(shipment.special_instructions.trim())
            .bind(now)
            .fetch_one(&mut *tx)
            .await;

            match result.map_err(DbError::from) {
                Ok(row) => {
                    created = Some(row);
                    break;
                }
                Err(DbError::UniqueViolation { ref field, .. })
                    if field.ends_with("internal_tracking_number") =>
                {
                    warn!(attempt, tracking = %tracking, "Tracking number collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        let created = created.ok_or_else(|| {
            DbError::Internal("could not allocate a unique tracking number".to_string())
        })?;

        record_history(
            &mut tx,
            HistoryEntry {
                shipment_id: created.id,
                previous: None,
                next: status,
                updated_by: created_by,
                location: "",
                notes: "",
                at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            shipment_id = created.id,
            tracking = %created.internal_tracking_number,
            status = status.label(),
            "Shipment requested"
        );
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shipment)
    }

    pub async fn get_by_tracking(&self, internal_tracking_number: &str) -> DbResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>(
            "SELECT * FROM shipments WHERE internal_tracking_number = ?1",
        )
        .bind(internal_tracking_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(shipment)
    }

    /// Newest request first.
    pub async fn list(&self, filter: ShipmentFilter, page: PageRequest) -> DbResult<Page<Shipment>> {
        debug!(?filter, page = page.page, "Listing shipments");

        const WHERE: &str = r#"
            WHERE (?1 IS NULL OR client_id = ?1)
              AND (?2 IS NULL OR status = ?2)
        "#;

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM shipments {WHERE}"))
            .bind(filter.client_id)
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        let shipments = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT * FROM shipments {WHERE} ORDER BY requested_at DESC, id DESC LIMIT ?3 OFFSET ?4"
        ))
        .bind(filter.client_id)
        .bind(filter.status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page, count, shipments))
    }

    pub async fn list_for_client(&self, client_id: i64, page: PageRequest) -> DbResult<Page<Shipment>> {
        self.list(
            ShipmentFilter {
                client_id: Some(client_id),
                status: None,
            },
            page,
        )
        .await
    }

    pub async fn list_all(
        &self,
        status: Option<ShipmentStatus>,
        page: PageRequest,
    ) -> DbResult<Page<Shipment>> {
        self.list(ShipmentFilter { client_id: None, status }, page).await
    }

    /// Adds a carrier tracking number and/or an invoice to a request.
    ///
    /// A request waiting for documents moves to `Solicitado`.
    ///
    /// ## Errors
    /// * `Domain(Validation(Required))` - neither document given
    /// * `NotFound` - unknown shipment
    pub async fn attach_documents(
        &self,
        id: i64,
        tracking_number: Option<&str>,
        invoice_path: Option<&str>,
        updated_by: Option<i64>,
    ) -> DbResult<Shipment> {
        if tracking_number.is_none() && invoice_path.is_none() {
            return Err(CoreError::from(ValidationError::Required {
                field: "tracking_number".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let current = fetch_for_update(&mut tx, id).await?;

        let next = if current.status == ShipmentStatus::DocumentationPending {
            ShipmentStatus::Requested
        } else {
            current.status
        };

        let updated = sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments SET
                original_tracking_number = COALESCE(?2, original_tracking_number),
                invoice_path = COALESCE(?3, invoice_path),
                status = ?4,
                updated_at = ?5
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tracking_number)
        .bind(invoice_path)
        .bind(next)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if next != current.status {
            record_history(
                &mut tx,
                HistoryEntry {
                    shipment_id: id,
                    previous: Some(current.status),
                    next,
                    updated_by,
                    location: "",
                    notes: "Documentos recibidos",
                    at: now,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(shipment_id = id, status = next.label(), "Shipment documents attached");
        Ok(updated)
    }

    /// Moves a shipment forward, stamping the matching milestone.
    ///
    /// ## Errors
    /// * `Domain(InvalidStatusTransition)` - same or earlier status
    /// * `NotFound` - unknown shipment
    pub async fn advance_status(&self, id: i64, change: &StatusChange) -> DbResult<Shipment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let current = fetch_for_update(&mut tx, id).await?;

        let next = current.status.advance_to(change.status)?;

        // A milestone keeps the first time it was reached
        let milestone_sql = next
            .milestone()
            .map(|m| {
                let column = milestone_column(m);
                format!(", {column} = COALESCE({column}, ?3)")
            })
            .unwrap_or_default();

        let updated = sqlx::query_as::<_, Shipment>(&format!(
            r#"
            UPDATE shipments SET
                status = ?2,
                updated_at = ?3,
                actual_weight_hundredths = COALESCE(?4, actual_weight_hundredths)
                {milestone_sql}
            WHERE id = ?1
            RETURNING *
            "#
        ))
        .bind(id)
        .bind(next)
        .bind(now)
        .bind(change.actual_weight_hundredths)
        .fetch_one(&mut *tx)
        .await?;

        record_history(
            &mut tx,
            HistoryEntry {
                shipment_id: id,
                previous: Some(current.status),
                next,
                updated_by: change.updated_by,
                location: &change.location,
                notes: &change.notes,
                at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            shipment_id = id,
            from = current.status.label(),
            to = next.label(),
            "Shipment status advanced"
        );
        Ok(updated)
    }

    /// Status history, oldest first.
    pub async fn history(&self, shipment_id: i64) -> DbResult<Vec<StatusUpdate>> {
        let updates = sqlx::query_as::<_, StatusUpdate>(
            "SELECT * FROM shipment_status_updates WHERE shipment_id = ?1 ORDER BY created_at, id",
        )
        .bind(shipment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(updates)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
