//! # Quote Repository
//!
//! Quotes (cotizaciones) and their articles.
//!
//! ## Adding an Article
//! ```text
//! BEGIN
//!   SELECT quote            → must be Pendiente and not past expires_at
//!   INSERT quote_items      → calculated amounts of the new article
//!   SELECT all items        → QuoteTotals::from_items(...)
//!   UPDATE quotes totals    → subtotal, freight, taxes, total
//! COMMIT
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{Page, PageRequest};
use crate::error::{DbError, DbResult};
use sicarga_core::{Money, Quote, QuoteItem, QuoteStatus, QuoteTotals};

/// List filter. `status` is compared against the effective status, so a
/// pending quote past its expiry lists as `Expirada`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteFilter {
    pub client_id: Option<i64>,
    pub status: Option<QuoteStatus>,
}

/// A quote header with its articles.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteWithItems {
    pub quote: Quote,
    pub items: Vec<QuoteItem>,
}

#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Creates an empty pending quote valid for `validity_days`.
    pub async fn create(&self, client_id: Option<i64>, validity_days: i64) -> DbResult<Quote> {
        let now = Utc::now();

        let quote = sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quotes (client_id, created_at, expires_at, status)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(now)
        .bind(Quote::expiry_for(now, validity_days))
        .bind(QuoteStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        info!(quote_id = quote.id, client_id = ?client_id, "Quote created");
        Ok(quote)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Quote>> {
        let quote = sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(quote)
    }

    pub async fn get_with_items(&self, id: i64) -> DbResult<Option<QuoteWithItems>> {
        let Some(quote) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(QuoteWithItems { quote, items }))
    }

    /// Articles of a quote in insertion order.
    pub async fn items(&self, quote_id: i64) -> DbResult<Vec<QuoteItem>> {
        let items = sqlx::query_as::<_, QuoteItem>(
            "SELECT * FROM quote_items WHERE quote_id = ?1 ORDER BY id",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Newest first.
    pub async fn list(&self, filter: QuoteFilter, page: PageRequest) -> DbResult<Page<Quote>> {
        debug!(?filter, page = page.page, "Listing quotes");

        // ?3 = now; pending rows past expiry count as expired
        const WHERE: &str = r#"
            WHERE (?1 IS NULL OR client_id = ?1)
              AND (?2 IS NULL
                   OR (?2 = 'Pendiente' AND status = 'Pendiente' AND expires_at > ?3)
                   OR (?2 = 'Expirada' AND (status = 'Expirada'
                                            OR (status = 'Pendiente' AND expires_at <= ?3)))
                   OR (?2 = 'Aceptada' AND status = 'Aceptada'))
        "#;

        let now = Utc::now();

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM quotes {WHERE}"))
            .bind(filter.client_id)
            .bind(filter.status)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let quotes = sqlx::query_as::<_, Quote>(&format!(
            "SELECT * FROM quotes {WHERE} ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
        ))
        .bind(filter.client_id)
        .bind(filter.status)
        .bind(now)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page, count, quotes))
    }

    /// Stores a calculated article and recomputes the quote totals.
    ///
    /// ## Arguments
    /// * `item` - article built with `QuoteItem::from_breakdown`
    /// * `freight_rate` - current cost per pound, for consolidated freight
    /// * `consolidate` - bill freight on the combined box
    ///
    /// ## Errors
    /// * `NotFound` - no such quote
    /// * `Domain(QuoteExpired | InvalidQuoteStatus)` - quote is not open
    pub async fn add_item(
        &self,
        quote_id: i64,
        item: &QuoteItem,
        freight_rate: Money,
        consolidate: bool,
    ) -> DbResult<QuoteWithItems> {
        let mut tx = self.pool.begin().await?;

        let quote = sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = ?1")
            .bind(quote_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", quote_id))?;

        quote.ensure_open(Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO quote_items (
                quote_id, original_description, tariff_item_id, declared_value_cents,
                length_hundredths, width_hundredths, height_hundredths,
                weight_hundredths, volumetric_weight_hundredths,
                freight_rate_cents, freight_cents,
                dai_cents, isc_cents, ispc_cents, isv_cents, total_tax_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(quote_id)
        .bind(&item.original_description)
        .bind(item.tariff_item_id)
        .bind(item.declared_value_cents)
        .bind(item.length_hundredths)
        .bind(item.width_hundredths)
        .bind(item.height_hundredths)
        .bind(item.weight_hundredths)
        .bind(item.volumetric_weight_hundredths)
        .bind(item.freight_rate_cents)
        .bind(item.freight_cents)
        .bind(item.dai_cents)
        .bind(item.isc_cents)
        .bind(item.ispc_cents)
        .bind(item.isv_cents)
        .bind(item.total_tax_cents)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, QuoteItem>(
            "SELECT * FROM quote_items WHERE quote_id = ?1 ORDER BY id",
        )
        .bind(quote_id)
        .fetch_all(&mut *tx)
        .await?;

        let breakdowns: Vec<_> = items.iter().map(QuoteItem::to_breakdown).collect();
        let totals = QuoteTotals::from_items(&breakdowns, freight_rate, consolidate);

        let quote = sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes SET
                subtotal_cents = ?2,
                freight_cents = ?3,
                taxes_cents = ?4,
                total_cents = ?5
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(quote_id)
        .bind(totals.subtotal.cents())
        .bind(totals.freight.cents())
        .bind(totals.taxes.cents())
        .bind(totals.total.cents())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            quote_id,
            items = items.len(),
            total = %totals.total,
            "Article added to quote"
        );
        Ok(QuoteWithItems { quote, items })
    }

    pub async fn set_status(&self, id: i64, status: QuoteStatus) -> DbResult<Quote> {
        let quote = sqlx::query_as::<_, Quote>(
            "UPDATE quotes SET status = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Quote", id))?;

        info!(quote_id = id, status = status.label(), "Quote status changed");
        Ok(quote)
    }

    /// Accepts a quote if it is still open.
    ///
    /// The check and the write happen in one transaction so an expiring
    /// quote cannot be accepted late.
    pub async fn accept(&self, id: i64) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;

        let quote = sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", id))?;

        quote.ensure_open(Utc::now())?;

        let quote = sqlx::query_as::<_, Quote>(
            "UPDATE quotes SET status = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(QuoteStatus::Accepted)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(quote_id = id, "Quote accepted");
        Ok(quote)
    }

    /// Rewrites pending quotes past their expiry as `Expirada`.
    pub async fn expire_stale(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE quotes SET status = ?1 WHERE status = ?2 AND expires_at <= ?3",
        )
        .bind(QuoteStatus::Expired)
        .bind(QuoteStatus::Pending)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(expired = result.rows_affected(), "Stale quotes expired");
        }
        Ok(result.rows_affected())
    }

    /// Deletes a quote and its articles.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quote", id));
        }

        info!(quote_id = id, "Quote deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use sicarga_core::{calculate_quote, CoreError, Dimensions, QuoteInput, TariffRates, TaxRate, Weight};

    async fn setup() -> QuoteRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().quotes()
    }

    fn article(quote_id: i64, value_cents: i64, weight: i64, dims: Dimensions) -> QuoteItem {
        let breakdown = calculate_quote(
            &QuoteInput {
                declared_value: Money::from_cents(value_cents),
                weight: Weight::from_hundredths(weight),
                dimensions: dims,
            },
            &TariffRates {
                dai: TaxRate::from_bps(1500),
                isv: TaxRate::from_bps(1500),
                ..Default::default()
            },
            Money::from_cents(250),
        );
        QuoteItem::from_breakdown(quote_id, "Zapatos", None, dims, &breakdown)
    }

    #[tokio::test]
    async fn test_create_sets_expiry() {
        let repo = setup().await;
        let quote = repo.create(None, 15).await.unwrap();

        assert_eq!(quote.status, QuoteStatus::Pending);
        assert_eq!((quote.expires_at - quote.created_at).num_days(), 15);
        assert_eq!(quote.total_cents, 0);
    }

    #[tokio::test]
    async fn test_add_item_maintains_totals() {
        let repo = setup().await;
        let quote = repo.create(None, 15).await.unwrap();
        let rate = Money::from_cents(250);

        let first = article(quote.id, 10_000, 500, Dimensions::unit());
        let result = repo.add_item(quote.id, &first, rate, false).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.quote.subtotal_cents, 10_000);
        assert_eq!(result.quote.freight_cents, first.freight_cents);
        assert_eq!(result.quote.taxes_cents, first.total_tax_cents);
        assert_eq!(
            result.quote.total_cents,
            10_000 + first.freight_cents + first.total_tax_cents
        );

        let second = article(quote.id, 5_000, 200, Dimensions::unit());
        let result = repo.add_item(quote.id, &second, rate, false).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.quote.subtotal_cents, 15_000);
        assert_eq!(
            result.quote.freight_cents,
            first.freight_cents + second.freight_cents
        );
    }

    #[tokio::test]
    async fn test_consolidated_freight_uses_combined_weight() {
        let repo = setup().await;
        let quote = repo.create(None, 15).await.unwrap();
        let rate = Money::from_cents(250);

        // 2 lb actual, ~12.05 lb volumetric
        let bulky = article(quote.id, 2_000, 200, Dimensions::new(1000, 1000, 2000));
        // 10 lb actual, tiny box
        let heavy = article(quote.id, 2_000, 1000, Dimensions::unit());

        repo.add_item(quote.id, &bulky, rate, true).await.unwrap();
        let result = repo.add_item(quote.id, &heavy, rate, true).await.unwrap();

        let combined_volumetric = bulky.volumetric_weight_hundredths + heavy.volumetric_weight_hundredths;
        let billed = combined_volumetric.max(1200);
        assert_eq!(result.quote.freight_cents, rate.per_hundredths(billed).cents());
        assert!(result.quote.freight_cents < bulky.freight_cents + heavy.freight_cents);
    }

    #[tokio::test]
    async fn test_closed_quote_rejects_items() {
        let repo = setup().await;
        let rate = Money::from_cents(250);

        let expired = repo.create(None, 0).await.unwrap();
        let err = repo
            .add_item(expired.id, &article(expired.id, 100, 100, Dimensions::unit()), rate, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::QuoteExpired { .. })));
        assert!(repo.items(expired.id).await.unwrap().is_empty());

        let accepted = repo.create(None, 15).await.unwrap();
        repo.accept(accepted.id).await.unwrap();
        let err = repo
            .add_item(accepted.id, &article(accepted.id, 100, 100, Dimensions::unit()), rate, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidQuoteStatus { .. })));

        let err = repo
            .add_item(999, &article(999, 100, 100, Dimensions::unit()), rate, false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_accept_only_once() {
        let repo = setup().await;
        let quote = repo.create(None, 15).await.unwrap();

        let accepted = repo.accept(quote.id).await.unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);
        assert!(matches!(
            repo.accept(quote.id).await.unwrap_err(),
            DbError::Domain(CoreError::InvalidQuoteStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_by_effective_status() {
        let repo = setup().await;
        let open = repo.create(None, 15).await.unwrap();
        let stale = repo.create(None, 0).await.unwrap();
        let done = repo.create(None, 15).await.unwrap();
        repo.set_status(done.id, QuoteStatus::Accepted).await.unwrap();

        let page = |status| QuoteFilter { client_id: None, status: Some(status) };

        let pending = repo.list(page(QuoteStatus::Pending), PageRequest::default()).await.unwrap();
        assert_eq!(pending.count, 1);
        assert_eq!(pending.results[0].id, open.id);

        let expired = repo.list(page(QuoteStatus::Expired), PageRequest::default()).await.unwrap();
        assert_eq!(expired.count, 1);
        assert_eq!(expired.results[0].id, stale.id);

        let all = repo.list(QuoteFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.count, 3);

        assert_eq!(repo.expire_stale().await.unwrap(), 1);
        let stale = repo.get(stale.id).await.unwrap().unwrap();
        assert_eq!(stale.status, QuoteStatus::Expired);
    }

    #[tokio::test]
    async fn test_delete_cascades_items() {
        let repo = setup().await;
        let quote = repo.create(None, 15).await.unwrap();
        repo.add_item(
            quote.id,
            &article(quote.id, 100, 100, Dimensions::unit()),
            Money::from_cents(250),
            false,
        )
        .await
        .unwrap();

        repo.delete(quote.id).await.unwrap();
        assert!(repo.get_with_items(quote.id).await.unwrap().is_none());
        assert!(repo.items(quote.id).await.unwrap().is_empty());
        assert!(repo.delete(quote.id).await.unwrap_err().is_not_found());
    }
}
