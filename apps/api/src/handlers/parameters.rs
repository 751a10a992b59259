//! System parameters and the customer mailbox page.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use super::client_for;
use crate::auth::{AuthUser, StaffUser};
use crate::dto::{
    ClientSummary, MailboxResponse, OfficeContact, ParameterDto, ParameterUpdateRequest,
    PublicParameters,
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;
use sicarga_core::address::{google_maps_url, waze_url, whatsapp_url};
use sicarga_core::params::{
    CONSOLIDATOR_ADDRESS, HOME_DELIVERY, OFFICE_ADDRESS, OFFICE_PHONE, OFFICE_WHATSAPP,
};
use sicarga_db::ParameterRepository;

async fn public_parameters(params: &ParameterRepository) -> Result<PublicParameters, ApiError> {
    Ok(PublicParameters {
        direccion_consolidador: params.text_or(CONSOLIDATOR_ADDRESS, "").await?,
        direccion_oficina: params.text_or(OFFICE_ADDRESS, "").await?,
        whatsapp_oficina: params.text_or(OFFICE_WHATSAPP, "").await?,
        telefono_oficina: params.text_or(OFFICE_PHONE, "").await?,
        entrega_a_domicilio: params.bool_or(HOME_DELIVERY, true).await?,
    })
}

/// `GET /api/parametros/publicos/` (public)
pub async fn public(State(state): State<Arc<AppState>>) -> Result<Json<PublicParameters>, ApiError> {
    Ok(Json(public_parameters(&state.db.parameters()).await?))
}

/// `GET /api/parametros/` (staff)
pub async fn list(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<Json<Vec<ParameterDto>>, ApiError> {
    let params = state.db.parameters().list().await?;
    Ok(Json(params.iter().map(ParameterDto::from).collect()))
}

/// `PUT /api/parametros/{nombre}/` (staff)
///
/// Without `tipo_dato` the parameter must already exist and keeps its type.
pub async fn update(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(name): Path<String>,
    ApiJson(req): ApiJson<ParameterUpdateRequest>,
) -> Result<Json<ParameterDto>, ApiError> {
    let params = state.db.parameters();

    let param = match req.tipo_dato {
        Some(data_type) => params.upsert(&name, data_type, &req.valor).await?,
        None => params.update_value(&name, &req.valor).await?,
    };

    info!(name = %param.name, staff_id = staff.id, "Parameter updated by staff");
    Ok(Json(ParameterDto::from(&param)))
}

/// `GET /api/casillero/`: the caller's Miami mailbox address and how to
/// reach the office.
pub async fn mailbox(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<MailboxResponse>, ApiError> {
    let client = client_for(&state, &user).await?;
    let public = public_parameters(&state.db.parameters()).await?;

    let greeting = match client.client_code.as_deref() {
        Some(code) => format!("Hola, mi código de cliente es {}", code),
        None => format!("Hola, soy {}", client.full_name()),
    };

    let oficina = OfficeContact {
        whatsapp_url: whatsapp_url(&public.whatsapp_oficina, Some(&greeting)),
        google_maps_url: google_maps_url(&public.direccion_oficina),
        waze_url: waze_url(&public.direccion_oficina),
        direccion: public.direccion_oficina,
        telefono: public.telefono_oficina,
        whatsapp: public.whatsapp_oficina,
    };

    Ok(Json(MailboxResponse {
        direccion_casillero: client.mailbox_address(&public.direccion_consolidador),
        direccion_consolidador: public.direccion_consolidador,
        oficina,
        entrega_a_domicilio: public.entrega_a_domicilio,
        cliente: ClientSummary {
            id: client.id,
            nombre_completo: client.full_name(),
            codigo_cliente: client.client_code,
        },
    }))
}
