//! # Tariff Repository
//!
//! The customs tariff schedule (partidas arancelarias): staff CRUD, the
//! filtered list, the public product search and the FTS5 autocomplete.
//!
//! ## Autocomplete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "lapto 8471"                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fts_query() → "lapto"* "8471"*      (each token quoted, prefix match) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tariff_items_fts MATCH over item_no, description, search_keywords     │
//! │  (unicode61, diacritics folded: "cafe" finds "Café")                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ORDER BY rank (bm25) → score = -rank, higher is better                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{like_pattern, Page, PageRequest};
use crate::error::{DbError, DbResult};
use sicarga_core::{CourierCategory, TariffItem};

// =============================================================================
// Filters and Ordering
// =============================================================================

/// Filters of the tariff list. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct TariffFilter {
    pub courier_category: Option<CourierCategory>,
    pub item_no: Option<String>,
    pub tariff_code: Option<String>,
    pub package_type: Option<String>,
    pub requires_special_handling: Option<bool>,
    /// Substring over item_no, description and tariff_code.
    pub search: Option<String>,
}

/// Sort orders accepted by `?ordering=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TariffOrdering {
    #[default]
    ItemNo,
    ItemNoDesc,
    DaiRate,
    DaiRateDesc,
    Description,
}

impl TariffOrdering {
    /// Parses the query-string names (`item_no`, `-item_no`,
    /// `impuesto_dai`, `-impuesto_dai`, `descripcion`).
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "item_no" => Some(TariffOrdering::ItemNo),
            "-item_no" => Some(TariffOrdering::ItemNoDesc),
            "impuesto_dai" => Some(TariffOrdering::DaiRate),
            "-impuesto_dai" => Some(TariffOrdering::DaiRateDesc),
            "descripcion" => Some(TariffOrdering::Description),
            _ => None,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            TariffOrdering::ItemNo => "item_no ASC",
            TariffOrdering::ItemNoDesc => "item_no DESC",
            TariffOrdering::DaiRate => "dai_bps ASC, item_no ASC",
            TariffOrdering::DaiRateDesc => "dai_bps DESC, item_no ASC",
            TariffOrdering::Description => "description ASC, item_no ASC",
        }
    }
}

/// An autocomplete match with its relevance.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AutocompleteHit {
    #[sqlx(flatten)]
    pub item: TariffItem,
    pub score: f64,
}

/// Turns free text into an FTS5 query: every alphanumeric run becomes a
/// quoted prefix term, so user input can never inject FTS syntax.
///
/// Returns `None` when nothing searchable remains.
pub(crate) fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"*", t))
        .collect();

    (!terms.is_empty()).then(|| terms.join(" "))
}

fn json_list(values: &[String]) -> DbResult<String> {
    serde_json::to_string(values).map_err(|e| DbError::Internal(e.to_string()))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct TariffRepository {
    pool: SqlitePool,
}

impl TariffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TariffRepository { pool }
    }

    /// Inserts a new tariff line.
    ///
    /// ## Errors
    /// `UniqueViolation { field: "item_no" }` when the number exists.
    pub async fn insert(&self, item: &TariffItem) -> DbResult<TariffItem> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, TariffItem>(
            r#"
            INSERT INTO tariff_items (
                item_no, description, tariff_code,
                dai_bps, isc_bps, ispc_bps, isv_bps,
                courier_category, restrictions, package_type, max_weight_hundredths,
                requires_special_handling, special_instructions, search_keywords,
                chapter_code, heading_code, parent_code, hierarchy_level, is_leaf,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?20
            )
            RETURNING *
            "#,
        )
        .bind(item.item_no.trim())
        .bind(item.description.trim())
        .bind(item.tariff_code.trim())
        .bind(item.dai_bps)
        .bind(item.isc_bps)
        .bind(item.ispc_bps)
        .bind(item.isv_bps)
        .bind(item.courier_category)
        .bind(json_list(&item.restrictions)?)
        .bind(&item.package_type)
        .bind(item.max_weight_hundredths)
        .bind(item.requires_special_handling)
        .bind(&item.special_instructions)
        .bind(json_list(&item.search_keywords)?)
        .bind(&item.chapter_code)
        .bind(&item.heading_code)
        .bind(&item.parent_code)
        .bind(item.hierarchy_level)
        .bind(item.is_leaf)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("item_no", item.item_no.clone()),
            other => other,
        })?;

        info!(id = created.id, item_no = %created.item_no, "Tariff item created");
        Ok(created)
    }

    /// Inserts or refreshes a line from the published schedule.
    ///
    /// Only schedule data (description, code, rates, hierarchy) is
    /// overwritten; courier category, restrictions and handling notes
    /// maintained by staff survive a re-import.
    ///
    /// ## Returns
    /// The stored row and `true` when it was newly inserted.
    pub async fn upsert_by_item_no(&self, item: &TariffItem) -> DbResult<(TariffItem, bool)> {
        let now = Utc::now();

        let stored = sqlx::query_as::<_, TariffItem>(
            r#"
            INSERT INTO tariff_items (
                item_no, description, tariff_code,
                dai_bps, isc_bps, ispc_bps, isv_bps,
                courier_category, restrictions, package_type,
                search_keywords, chapter_code, heading_code, parent_code,
                hierarchy_level, is_leaf, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17
            )
            ON CONFLICT (item_no) DO UPDATE SET
                description = excluded.description,
                tariff_code = excluded.tariff_code,
                dai_bps = excluded.dai_bps,
                isc_bps = excluded.isc_bps,
                ispc_bps = excluded.ispc_bps,
                isv_bps = excluded.isv_bps,
                chapter_code = excluded.chapter_code,
                heading_code = excluded.heading_code,
                parent_code = excluded.parent_code,
                hierarchy_level = excluded.hierarchy_level,
                is_leaf = excluded.is_leaf,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(item.item_no.trim())
        .bind(item.description.trim())
        .bind(item.tariff_code.trim())
        .bind(item.dai_bps)
        .bind(item.isc_bps)
        .bind(item.ispc_bps)
        .bind(item.isv_bps)
        .bind(item.courier_category)
        .bind(json_list(&item.restrictions)?)
        .bind(&item.package_type)
        .bind(json_list(&item.search_keywords)?)
        .bind(&item.chapter_code)
        .bind(&item.heading_code)
        .bind(&item.parent_code)
        .bind(item.hierarchy_level)
        .bind(item.is_leaf)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        // An existing row keeps its original created_at
        let inserted = stored.created_at == stored.updated_at;
        Ok((stored, inserted))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<TariffItem>> {
        let item = sqlx::query_as::<_, TariffItem>("SELECT * FROM tariff_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    pub async fn get_by_item_no(&self, item_no: &str) -> DbResult<Option<TariffItem>> {
        let item = sqlx::query_as::<_, TariffItem>("SELECT * FROM tariff_items WHERE item_no = ?1")
            .bind(item_no.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Filtered, ordered, paginated list.
    pub async fn list(
        &self,
        filter: &TariffFilter,
        ordering: TariffOrdering,
        page: PageRequest,
    ) -> DbResult<Page<TariffItem>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        debug!(?filter, ?ordering, page = page.page, "Listing tariff items");

        const WHERE: &str = r#"
            WHERE (?1 IS NULL OR courier_category = ?1)
              AND (?2 IS NULL OR item_no = ?2)
              AND (?3 IS NULL OR tariff_code = ?3)
              AND (?4 IS NULL OR package_type = ?4)
              AND (?5 IS NULL OR requires_special_handling = ?5)
              AND (?6 IS NULL
                   OR item_no LIKE ?6 ESCAPE '\'
                   OR description LIKE ?6 ESCAPE '\'
                   OR tariff_code LIKE ?6 ESCAPE '\')
        "#;

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tariff_items {WHERE}"))
            .bind(filter.courier_category)
            .bind(&filter.item_no)
            .bind(&filter.tariff_code)
            .bind(&filter.package_type)
            .bind(filter.requires_special_handling)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, TariffItem>(&format!(
            "SELECT * FROM tariff_items {WHERE} ORDER BY {} LIMIT ?7 OFFSET ?8",
            ordering.order_by()
        ))
        .bind(filter.courier_category)
        .bind(&filter.item_no)
        .bind(&filter.tariff_code)
        .bind(&filter.package_type)
        .bind(filter.requires_special_handling)
        .bind(&search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page, count, items))
    }

    /// Public product search: description contains `query` (ASCII case
    /// folded), ordered by item number.
    pub async fn search_description(&self, query: &str, limit: u32) -> DbResult<Vec<TariffItem>> {
        let pattern = like_pattern(query.trim());

        let items = sqlx::query_as::<_, TariffItem>(
            r#"
            SELECT * FROM tariff_items
            WHERE description LIKE ?1 ESCAPE '\'
            ORDER BY item_no
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(query = %query, count = items.len(), "Product search");
        Ok(items)
    }

    /// Ranked prefix search for the quote form's tariff picker.
    pub async fn autocomplete(&self, query: &str, limit: u32) -> DbResult<Vec<AutocompleteHit>> {
        let Some(fts) = fts_query(query) else {
            return Ok(Vec::new());
        };

        debug!(query = %query, fts = %fts, limit, "Tariff autocomplete");

        let hits = sqlx::query_as::<_, AutocompleteHit>(
            r#"
            SELECT t.*, -tariff_items_fts.rank AS score
            FROM tariff_items t
            INNER JOIN tariff_items_fts ON t.id = tariff_items_fts.rowid
            WHERE tariff_items_fts MATCH ?1
            ORDER BY tariff_items_fts.rank
            LIMIT ?2
            "#,
        )
        .bind(fts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = hits.len(), "Autocomplete returned hits");
        Ok(hits)
    }

    /// Replaces every editable field of line `id`.
    pub async fn update(&self, id: i64, item: &TariffItem) -> DbResult<TariffItem> {
        let updated = sqlx::query_as::<_, TariffItem>(
            r#"
            UPDATE tariff_items SET
                item_no = ?2,
                description = ?3,
                tariff_code = ?4,
                dai_bps = ?5,
                isc_bps = ?6,
                ispc_bps = ?7,
                isv_bps = ?8,
                courier_category = ?9,
                restrictions = ?10,
                package_type = ?11,
                max_weight_hundredths = ?12,
                requires_special_handling = ?13,
                special_instructions = ?14,
                search_keywords = ?15,
                chapter_code = ?16,
                heading_code = ?17,
                parent_code = ?18,
                hierarchy_level = ?19,
                is_leaf = ?20,
                updated_at = ?21
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(item.item_no.trim())
        .bind(item.description.trim())
        .bind(item.tariff_code.trim())
        .bind(item.dai_bps)
        .bind(item.isc_bps)
        .bind(item.ispc_bps)
        .bind(item.isv_bps)
        .bind(item.courier_category)
        .bind(json_list(&item.restrictions)?)
        .bind(&item.package_type)
        .bind(item.max_weight_hundredths)
        .bind(item.requires_special_handling)
        .bind(&item.special_instructions)
        .bind(json_list(&item.search_keywords)?)
        .bind(&item.chapter_code)
        .bind(&item.heading_code)
        .bind(&item.parent_code)
        .bind(item.hierarchy_level)
        .bind(item.is_leaf)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("item_no", item.item_no.clone()),
            other => other,
        })?
        .ok_or_else(|| DbError::not_found("TariffItem", id))?;

        info!(id, item_no = %updated.item_no, "Tariff item updated");
        Ok(updated)
    }

    /// Deletes a line; quote articles that used it keep their amounts.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM tariff_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TariffItem", id));
        }

        info!(id, "Tariff item deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tariff_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use sicarga_core::{TariffRates, TaxRate};

    async fn setup() -> TariffRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().tariffs()
    }

    fn item(item_no: &str, description: &str, dai: u32) -> TariffItem {
        TariffItem::new(
            item_no,
            description,
            TariffRates {
                dai: TaxRate::from_bps(dai),
                isv: TaxRate::from_bps(1500),
                ..Default::default()
            },
        )
    }

    async fn seeded() -> TariffRepository {
        let repo = setup().await;
        let mut laptop = item("8471.30.00.00", "Máquinas portátiles (laptops)", 0);
        laptop.search_keywords = vec!["computadora".to_string(), "notebook".to_string()];
        repo.insert(&laptop).await.unwrap();

        let mut coffee = item("0901.21.00.00", "Café tostado", 1500);
        coffee.courier_category = CourierCategory::Restricted;
        coffee.requires_special_handling = true;
        repo.insert(&coffee).await.unwrap();

        let mut shoes = item("6403.99.00.00", "Calzado de cuero", 1000);
        shoes.package_type = "CAJA_PEQUENA".to_string();
        repo.insert(&shoes).await.unwrap();

        repo
    }

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(fts_query("lapto").as_deref(), Some("\"lapto\"*"));
        assert_eq!(
            fts_query("8471.30 \"OR\" x*").as_deref(),
            Some("\"8471\"* \"30\"* \"OR\"* \"x\"*")
        );
        assert_eq!(fts_query(" .-* "), None);
    }

    #[test]
    fn test_ordering_names() {
        assert_eq!(TariffOrdering::parse("-impuesto_dai"), Some(TariffOrdering::DaiRateDesc));
        assert_eq!(TariffOrdering::parse("precio"), None);
    }

    #[tokio::test]
    async fn test_insert_round_trips_json_columns() {
        let repo = seeded().await;
        let laptop = repo.get_by_item_no("8471.30.00.00").await.unwrap().unwrap();

        assert_eq!(laptop.search_keywords, vec!["computadora", "notebook"]);
        assert!(laptop.restrictions.is_empty());
        assert_eq!(laptop.chapter_code.as_deref(), Some("8471"));
        assert_eq!(laptop.isv_bps, 1500);

        let err = repo.insert(&item("8471.30.00.00", "dup", 0)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "item_no"));
    }

    #[tokio::test]
    async fn test_list_filters_and_ordering() {
        let repo = seeded().await;

        let page = repo
            .list(&TariffFilter::default(), TariffOrdering::DaiRateDesc, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results[0].item_no, "0901.21.00.00");

        let restricted = repo
            .list(
                &TariffFilter {
                    courier_category: Some(CourierCategory::Restricted),
                    ..Default::default()
                },
                TariffOrdering::ItemNo,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(restricted.count, 1);

        let special = repo
            .list(
                &TariffFilter {
                    requires_special_handling: Some(false),
                    package_type: Some("CAJA_PEQUENA".to_string()),
                    ..Default::default()
                },
                TariffOrdering::ItemNo,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(special.count, 1);
        assert_eq!(special.results[0].item_no, "6403.99.00.00");

        let searched = repo
            .list(
                &TariffFilter {
                    search: Some("CUERO".to_string()),
                    ..Default::default()
                },
                TariffOrdering::ItemNo,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(searched.count, 1);
    }

    #[tokio::test]
    async fn test_search_description() {
        let repo = seeded().await;
        let hits = repo.search_description("LAPTOP", 50).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(repo.search_description("zzz", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autocomplete_prefix_keywords_and_diacritics() {
        let repo = seeded().await;

        let hits = repo.autocomplete("compu", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.item_no, "8471.30.00.00");

        let hits = repo.autocomplete("cafe", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.item_no, "0901.21.00.00");

        let hits = repo.autocomplete("8471", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(repo.autocomplete("***", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_fts_in_sync() {
        let repo = seeded().await;
        let mut shoes = repo.get_by_item_no("6403.99.00.00").await.unwrap().unwrap();
        shoes.description = "Zapatillas deportivas".to_string();

        let updated = repo.update(shoes.id, &shoes).await.unwrap();
        assert_eq!(updated.description, "Zapatillas deportivas");
        assert_eq!(repo.autocomplete("zapatil", 20).await.unwrap().len(), 1);
        assert!(repo.autocomplete("calzado", 20).await.unwrap().is_empty());

        assert!(repo.update(999, &shoes).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_preserves_staff_fields() {
        let repo = seeded().await;

        let (coffee, inserted) = repo
            .upsert_by_item_no(&item("0901.21.00.00", "Café tostado sin descafeinar", 1000))
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(coffee.description, "Café tostado sin descafeinar");
        assert_eq!(coffee.dai_bps, 1000);
        assert_eq!(coffee.courier_category, CourierCategory::Restricted);
        assert!(coffee.requires_special_handling);

        let (_, inserted) = repo
            .upsert_by_item_no(&item("0902.10.00.00", "Té verde", 1500))
            .await
            .unwrap();
        assert!(inserted);
        assert_eq!(repo.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = seeded().await;
        let laptop = repo.get_by_item_no("8471.30.00.00").await.unwrap().unwrap();

        repo.delete(laptop.id).await.unwrap();
        assert!(repo.get_by_id(laptop.id).await.unwrap().is_none());
        assert!(repo.autocomplete("laptop", 20).await.unwrap().is_empty());
        assert!(repo.delete(laptop.id).await.unwrap_err().is_not_found());
    }
}
