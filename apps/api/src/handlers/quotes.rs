//! Landed-cost calculator and saved quotes.
//!
//! ```text
//! POST /api/cotizar/                  public, nothing stored
//! POST /api/cotizaciones/             empty pending quote for the caller
//! POST /api/cotizaciones/{id}/articulos/
//!      │
//!      ├── same calculation as /api/cotizar/
//!      └── QuoteRepository::add_item → totals recomputed
//! POST /api/cotizaciones/{id}/aceptar/  Pendiente → Aceptada
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::info;

use super::{client_for, ensure_owner_or_staff, non_blank};
use crate::auth::AuthUser;
use crate::dto::{
    ArticleInput, QuoteCalculation, QuoteCalculationResponse, QuoteDetail, QuoteDto, QuoteItemDto,
    QuoteRequest,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use sicarga_core::{
    calculate_quote, CoreError, CourierCategory, Quote, QuoteBreakdown, QuoteItem, QuoteStatus,
    TariffItem, QUOTE_CACHE_TTL_HOURS,
};
use sicarga_db::{Page, PageRequest, QuoteFilter, QuoteWithItems};

/// Resolves the tariff line and runs the calculator for one article.
async fn price_article(
    state: &AppState,
    article: &ArticleInput,
) -> Result<(TariffItem, QuoteBreakdown), ApiError> {
    let item = state
        .db
        .tariffs()
        .get_by_id(article.tariff_id)
        .await?
        .ok_or_else(|| CoreError::TariffItemNotFound(article.tariff_id.to_string()))?;

    if item.courier_category == CourierCategory::Prohibited {
        return Err(CoreError::ProhibitedItem {
            item_no: item.item_no.clone(),
        }
        .into());
    }

    let freight_rate = state.db.parameters().freight_cost_per_lb().await?;
    let breakdown = calculate_quote(&article.input, &item.rates(), freight_rate);
    Ok((item, breakdown))
}

async fn load_quote(state: &AppState, id: i64) -> Result<Quote, ApiError> {
    state
        .db
        .quotes()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Quote {} not found", id)))
}

fn detail(found: &QuoteWithItems) -> QuoteDetail {
    QuoteDetail {
        quote: QuoteDto::new(&found.quote, Utc::now()),
        articulos: found.items.iter().map(QuoteItemDto::from).collect(),
    }
}

/// `POST /api/cotizar/` (public)
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<QuoteRequest>,
) -> Result<Json<QuoteCalculationResponse>, ApiError> {
    let article = req.validate()?;
    let (item, breakdown) = price_article(&state, &article).await?;

    info!(
        item_no = %item.item_no,
        declared_value = %breakdown.declared_value,
        total = %breakdown.total_with_value,
        "Quote calculated"
    );

    let cache_until = Utc::now() + Duration::hours(QUOTE_CACHE_TTL_HOURS);
    Ok(Json(QuoteCalculationResponse {
        success: true,
        data: QuoteCalculation::new(&article, &item, &breakdown, cache_until),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub estado: Option<String>,
}

/// `GET /api/cotizaciones/`: staff see every quote, clients their own.
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<QuoteListQuery>,
) -> Result<Json<Page<QuoteDto>>, ApiError> {
    let status = match non_blank(query.estado) {
        Some(text) => Some(QuoteStatus::parse(&text)?),
        None => None,
    };

    let client_id = if user.is_staff {
        None
    } else {
        Some(client_for(&state, &user).await?.id)
    };

    let page = state
        .db
        .quotes()
        .list(
            QuoteFilter { client_id, status },
            PageRequest::new(query.page, query.page_size),
        )
        .await?;

    let now = Utc::now();
    Ok(Json(page.map(|quote| QuoteDto::new(&quote, now))))
}

/// `POST /api/cotizaciones/`
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<(StatusCode, Json<QuoteDto>), ApiError> {
    let client = client_for(&state, &user).await?;
    let validity_days = state.db.parameters().quote_validity_days().await?;

    let quote = state.db.quotes().create(Some(client.id), validity_days).await?;

    info!(quote_id = quote.id, client_id = client.id, "Quote created");
    Ok((StatusCode::CREATED, Json(QuoteDto::new(&quote, Utc::now()))))
}

/// `GET /api/cotizaciones/{id}/`
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<QuoteDetail>, ApiError> {
    let found = state
        .db
        .quotes()
        .get_with_items(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Quote {} not found", id)))?;

    ensure_owner_or_staff(&state, &user, found.quote.client_id).await?;
    Ok(Json(detail(&found)))
}

/// `DELETE /api/cotizaciones/{id}/`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let quote = load_quote(&state, id).await?;
    ensure_owner_or_staff(&state, &user, quote.client_id).await?;

    state.db.quotes().delete(id).await?;
    info!(quote_id = id, user_id = user.id, "Quote deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/cotizaciones/{id}/articulos/`
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<QuoteRequest>,
) -> Result<(StatusCode, Json<QuoteDetail>), ApiError> {
    let quote = load_quote(&state, id).await?;
    ensure_owner_or_staff(&state, &user, quote.client_id).await?;
    quote.ensure_open(Utc::now())?;

    let article = req.validate()?;
    let (item, breakdown) = price_article(&state, &article).await?;

    let line = QuoteItem::from_breakdown(
        quote.id,
        &article.description,
        Some(item.id),
        article.input.dimensions,
        &breakdown,
    );
    let consolidate = state.db.parameters().allow_consolidation().await?;

    let updated = state
        .db
        .quotes()
        .add_item(quote.id, &line, breakdown.freight_rate, consolidate)
        .await?;

    info!(
        quote_id = quote.id,
        item_no = %item.item_no,
        total = %updated.quote.total(),
        "Article added to quote"
    );
    Ok((StatusCode::CREATED, Json(detail(&updated))))
}

/// `POST /api/cotizaciones/{id}/aceptar/`
pub async fn accept(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<QuoteDto>, ApiError> {
    let quote = load_quote(&state, id).await?;
    ensure_owner_or_staff(&state, &user, quote.client_id).await?;

    let quote = state.db.quotes().accept(id).await?;
    Ok(Json(QuoteDto::new(&quote, Utc::now())))
}
