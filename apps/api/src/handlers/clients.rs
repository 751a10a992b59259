//! Customer profiles (`/api/clientes/`).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::{client_for, non_blank};
use crate::auth::{AuthUser, StaffUser};
use crate::dto::{ClientDto, ContactRequest};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use sicarga_db::{ClientFilter, Page, PageRequest};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

/// `GET /api/clientes/` (staff)
pub async fn list(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<ClientListQuery>,
) -> Result<Json<Page<ClientDto>>, ApiError> {
    let filter = ClientFilter {
        search: non_blank(query.search),
    };

    let page = state
        .db
        .clients()
        .list(&filter, PageRequest::new(query.page, query.page_size))
        .await?;

    Ok(Json(page.map(|client| ClientDto::from(&client))))
}

/// `GET /api/clientes/me/`
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ClientDto>, ApiError> {
    let client = client_for(&state, &user).await?;
    Ok(Json(ClientDto::from(&client)))
}

/// `PATCH /api/clientes/me/`: phone, address, city, department.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ContactRequest>,
) -> Result<Json<ClientDto>, ApiError> {
    let update = req.validate()?;
    let client = client_for(&state, &user).await?;

    let client = state.db.clients().update_contact(client.id, &update).await?;

    info!(client_id = client.id, "Client contact updated");
    Ok(Json(ClientDto::from(&client)))
}

/// `GET /api/clientes/{id}/` (owner or staff)
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ClientDto>, ApiError> {
    let client = state
        .db
        .clients()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Client {} not found", id)))?;

    if !user.is_staff && !client.is_owned_by(user.id) {
        return Err(ApiError::forbidden("You do not have permission to access this client"));
    }

    Ok(Json(ClientDto::from(&client)))
}
