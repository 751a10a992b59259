//! Tariff schedule endpoints (`/api/partidas/`, `/api/buscar-partidas/`).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::non_blank;
use crate::auth::{AuthUser, StaffUser};
use crate::dto::{AutocompleteResult, Results, TariffItemDto, TariffItemRequest};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use sicarga_core::tariff::ShippingRequirements;
use sicarga_core::validation::{autocomplete_query, validate_search_query};
use sicarga_core::{CourierCategory, TariffItem, ValidationError, AUTOCOMPLETE_LIMIT, PRODUCT_SEARCH_LIMIT};
use sicarga_db::{Page, PageRequest, TariffFilter, TariffOrdering};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TariffListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub courier_category: Option<String>,
    pub item_no: Option<String>,
    pub partida_arancelaria: Option<String>,
    pub package_type: Option<String>,
    pub requires_special_handling: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl TariffListQuery {
    fn filter(&self) -> Result<TariffFilter, ApiError> {
        let courier_category = match non_blank(self.courier_category.clone()) {
            Some(text) => Some(CourierCategory::parse(&text)?),
            None => None,
        };

        let requires_special_handling = match non_blank(self.requires_special_handling.clone()) {
            Some(text) => Some(parse_flag("requires_special_handling", &text)?),
            None => None,
        };

        Ok(TariffFilter {
            courier_category,
            item_no: non_blank(self.item_no.clone()),
            tariff_code: non_blank(self.partida_arancelaria.clone()),
            package_type: non_blank(self.package_type.clone()),
            requires_special_handling,
            search: non_blank(self.search.clone()),
        })
    }
}

fn parse_flag(field: &str, text: &str) -> Result<bool, ValidationError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: vec!["true".to_string(), "false".to_string()],
        }),
    }
}

async fn load(state: &AppState, id: i64) -> Result<TariffItem, ApiError> {
    state
        .db
        .tariffs()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tariff item {} not found", id)))
}

/// `GET /api/partidas/`
pub async fn list(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<TariffListQuery>,
) -> Result<Json<Page<TariffItemDto>>, ApiError> {
    let filter = query.filter()?;
    // Unknown orderings fall back to item number.
    let ordering = query
        .ordering
        .as_deref()
        .and_then(TariffOrdering::parse)
        .unwrap_or_default();

    let page = state
        .db
        .tariffs()
        .list(&filter, ordering, PageRequest::new(query.page, query.page_size))
        .await?;

    Ok(Json(page.map(|item| TariffItemDto::from(&item))))
}

/// `GET /api/partidas/{id}/`
pub async fn get(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<TariffItemDto>, ApiError> {
    let item = load(&state, id).await?;
    Ok(Json(TariffItemDto::from(&item)))
}

/// `GET /api/partidas/{id}/requirements/`
pub async fn requirements(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ShippingRequirements>, ApiError> {
    let item = load(&state, id).await?;
    Ok(Json(item.shipping_requirements()))
}

/// `POST /api/partidas/` (staff)
pub async fn create(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    ApiJson(req): ApiJson<TariffItemRequest>,
) -> Result<(StatusCode, Json<TariffItemDto>), ApiError> {
    let item = req.validate()?;
    let item = state.db.tariffs().insert(&item).await?;

    info!(item_no = %item.item_no, staff_id = staff.id, "Tariff item created");
    Ok((StatusCode::CREATED, Json(TariffItemDto::from(&item))))
}

/// `PUT /api/partidas/{id}/` (staff)
pub async fn update(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<TariffItemRequest>,
) -> Result<Json<TariffItemDto>, ApiError> {
    let item = req.validate()?;
    let item = state.db.tariffs().update(id, &item).await?;

    info!(item_no = %item.item_no, staff_id = staff.id, "Tariff item updated");
    Ok(Json(TariffItemDto::from(&item)))
}

/// `DELETE /api/partidas/{id}/` (staff)
pub async fn delete(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.tariffs().delete(id).await?;
    info!(tariff_id = id, staff_id = staff.id, "Tariff item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductSearchQuery {
    pub query: Option<String>,
}

/// `GET /api/partidas/search_products/?query=` (public)
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ProductSearchQuery>,
) -> Result<Json<Results<TariffItemDto>>, ApiError> {
    let query = validate_search_query(params.query.as_deref().unwrap_or(""))?;
    if query.is_empty() {
        return Err(ValidationError::Required {
            field: "query".to_string(),
        }
        .into());
    }

    let items = state
        .db
        .tariffs()
        .search_description(&query, PRODUCT_SEARCH_LIMIT)
        .await?;

    Ok(Json(Results {
        results: items.iter().map(TariffItemDto::from).collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
}

/// `GET /api/buscar-partidas/?q=` (public)
///
/// Fewer than three characters returns an empty list, not an error.
pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<AutocompleteQuery>,
) -> Result<Json<Results<AutocompleteResult>>, ApiError> {
    let Some(query) = params.q.as_deref().and_then(autocomplete_query) else {
        return Ok(Json(Results { results: Vec::new() }));
    };

    let hits = state.db.tariffs().autocomplete(&query, AUTOCOMPLETE_LIMIT).await?;

    let results = hits
        .into_iter()
        .map(|hit| AutocompleteResult {
            id: hit.item.id,
            text: hit.item.autocomplete_label(),
            codigo: hit.item.item_no,
            descripcion: hit.item.description,
            keywords: hit.item.search_keywords,
            score: hit.score,
        })
        .collect();

    Ok(Json(Results { results }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("x", "TRUE").unwrap());
        assert!(!parse_flag("x", "0").unwrap());
        assert!(parse_flag("x", "maybe").is_err());
    }

    #[test]
    fn test_list_query_filter() {
        let query = TariffListQuery {
            courier_category: Some("prohibited".to_string()),
            requires_special_handling: Some("false".to_string()),
            partida_arancelaria: Some("  ".to_string()),
            search: Some("laptop".to_string()),
            ..Default::default()
        };

        let filter = query.filter().unwrap();
        assert_eq!(filter.courier_category, Some(CourierCategory::Prohibited));
        assert_eq!(filter.requires_special_handling, Some(false));
        assert_eq!(filter.tariff_code, None);
        assert_eq!(filter.search.as_deref(), Some("laptop"));
    }

    #[test]
    fn test_list_query_rejects_unknown_category() {
        let query = TariffListQuery {
            courier_category: Some("SOMETIMES".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(ApiError::Validation { .. })));
    }
}
