//! Shipping requests (`/api/shipping/`).
//!
//! The browser sends `multipart/form-data` when an invoice is attached and
//! JSON otherwise; both end up as the same [`ShippingForm`].
//!
//! ```text
//! request ──► ShippingForm {fields, Option<Upload>}
//!                 │
//!                 ├── validate fields (nothing stored yet)
//!                 ├── InvoiceStore::save (if a file came)
//!                 └── ShipmentRepository::create / attach_documents
//! ```

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{client_for, ensure_owner_or_staff, non_blank};
use crate::auth::{AuthUser, StaffUser};
use crate::dto::{DecimalInput, ShipmentDetail, ShipmentDto, StatusChangeRequest, StatusUpdateDto};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use sicarga_core::address::compose_delivery_address;
use sicarga_core::validation::{
    validate_max_len, validate_tracking_number, validate_weight, FieldErrors,
};
use sicarga_core::{Client, NewShipment, Shipment, ShipmentStatus, ValidationError, Weight, WeightUnit};
use sicarga_db::{DbResult, Page, PageRequest, ShipmentFilter, StatusChange};

const INVOICE_FIELD: &str = "factura_compra";

// =============================================================================
// Form Parsing
// =============================================================================

/// Text fields of a shipping request or document update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShippingFields {
    #[serde(alias = "quote_id", alias = "cotizacion")]
    pub cotizacion_id: Option<DecimalInput>,
    #[serde(alias = "tracking_number_original")]
    pub tracking_number: Option<String>,
    #[serde(alias = "peso")]
    pub peso_estimado: Option<DecimalInput>,
    pub direccion_entrega: Option<String>,
    pub ciudad: Option<String>,
    pub departamento: Option<String>,
    pub instrucciones_especiales: Option<String>,
}

/// An uploaded invoice, still in memory.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ShippingForm {
    pub fields: ShippingFields,
    pub invoice: Option<Upload>,
}

impl ShippingForm {
    async fn read(request: Request, state: &Arc<AppState>) -> Result<Self, ApiError> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let ApiJson(fields) = ApiJson::<ShippingFields>::from_request(request, state).await?;
            return Ok(ShippingForm {
                fields,
                invoice: None,
            });
        }

        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        let mut text = Map::new();
        let mut invoice = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == INVOICE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                debug!(filename = %filename, size = bytes.len(), "Invoice received");
                invoice = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            } else if !name.is_empty() {
                let value = field.text().await?;
                text.insert(name, Value::String(value));
            }
        }

        let fields = serde_json::from_value(Value::Object(text))
            .map_err(|e| ApiError::bad_request(format!("Invalid form data: {}", e)))?;

        Ok(ShippingForm { fields, invoice })
    }
}

fn parse_quote_id(value: &Option<DecimalInput>) -> Result<Option<i64>, ValidationError> {
    let Some(text) = value.as_ref().map(|v| v.text()).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| ValidationError::invalid("cotizacion_id", "must be a quote id"))
}

fn parse_tracking(value: Option<String>) -> Result<Option<String>, ValidationError> {
    non_blank(value)
        .map(|tracking| validate_tracking_number(&tracking))
        .transpose()
}

fn parse_weight(value: &Option<DecimalInput>) -> Result<Option<Weight>, ValidationError> {
    let Some(text) = value.as_ref().map(|v| v.text()).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let weight = Weight::parse("peso_estimado", &text, WeightUnit::Lb)?;
    validate_weight("peso_estimado", weight).map(Some)
}

async fn load_shipment(state: &AppState, id: i64) -> Result<Shipment, ApiError> {
    state
        .db
        .shipments()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Shipment {} not found", id)))
}

/// Estimated weight of a quote: the sum of its articles.
async fn quote_weight(state: &AppState, quote_id: i64) -> Result<Weight, ApiError> {
    let items = state.db.quotes().items(quote_id).await?;
    Ok(items
        .iter()
        .map(|item| Weight::from_hundredths(item.weight_hundredths))
        .sum())
}

/// Deletes a just-saved invoice when the write that should reference it
/// failed.
async fn keep_invoice_if_ok(
    state: &AppState,
    invoice_path: Option<&str>,
    result: DbResult<Shipment>,
) -> Result<Shipment, ApiError> {
    if result.is_err() {
        if let Some(path) = invoice_path {
            state.media.discard(path).await;
        }
    }
    Ok(result?)
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/shipping/request/`
pub async fn request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    request: Request,
) -> Result<(StatusCode, Json<ShipmentDto>), ApiError> {
    let ShippingForm { fields, invoice } = ShippingForm::read(request, &state).await?;
    let client = client_for(&state, &user).await?;

    let mut errors = FieldErrors::new();
    let quote_id = errors.check(parse_quote_id(&fields.cotizacion_id)).flatten();
    let tracking = errors.check(parse_tracking(fields.tracking_number)).flatten();
    let weight = errors.check(parse_weight(&fields.peso_estimado)).flatten();

    let address = non_blank(fields.direccion_entrega);
    match &address {
        Some(address) => {
            errors.check(validate_max_len("direccion_entrega", address, 255));
        }
        None => errors.push(ValidationError::Required {
            field: "direccion_entrega".to_string(),
        }),
    }

    let instructions = non_blank(fields.instrucciones_especiales).unwrap_or_default();
    errors.check(validate_max_len("instrucciones_especiales", &instructions, 500));
    errors.into_result()?;

    if let Some(quote_id) = quote_id {
        let quote = state
            .db
            .quotes()
            .get(quote_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Quote {} not found", quote_id)))?;
        if !quote.is_owned_by(client.id) {
            return Err(ApiError::forbidden("Quote belongs to another client"));
        }
    }

    let estimated_weight = match (weight, quote_id) {
        (Some(weight), _) => weight,
        (None, Some(quote_id)) => quote_weight(&state, quote_id).await?,
        (None, None) => Weight::zero(),
    };
    if estimated_weight.hundredths() <= 0 {
        return Err(ValidationError::Required {
            field: "peso_estimado".to_string(),
        }
        .into());
    }

    let invoice_path = match invoice {
        Some(upload) => Some(state.media.save(&upload.filename, &upload.bytes).await?),
        None => None,
    };

    let delivery_address = delivery_address(
        &client,
        address.as_deref().unwrap_or_default(),
        fields.ciudad,
        fields.departamento,
    );

    let created = state
        .db
        .shipments()
        .create(
            &NewShipment {
                quote_id,
                client_id: client.id,
                original_tracking_number: tracking,
                invoice_path: invoice_path.clone(),
                estimated_weight,
                delivery_address,
                special_instructions: instructions,
            },
            Some(user.id),
        )
        .await;
    let shipment = keep_invoice_if_ok(&state, invoice_path.as_deref(), created).await?;

    Ok((StatusCode::CREATED, Json(ShipmentDto::from(&shipment))))
}

/// City and department default to the client's own.
fn delivery_address(client: &Client, address: &str, city: Option<String>, department: Option<String>) -> String {
    let city = non_blank(city).unwrap_or_else(|| client.city.clone());
    let department = non_blank(department).unwrap_or_else(|| client.department.clone());
    compose_delivery_address(address, &city, &department)
}

/// `PATCH /api/shipping/update/{id}/`: the owner adds a tracking number
/// and/or invoice.
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ShipmentDto>, ApiError> {
    let shipment = load_shipment(&state, id).await?;

    let owner = state.db.clients().get_by_user_id(user.id).await?;
    if owner.map(|client| client.id) != Some(shipment.client_id) {
        return Err(ApiError::forbidden("You can only update your own shipments"));
    }

    let ShippingForm { fields, invoice } = ShippingForm::read(request, &state).await?;
    let tracking = parse_tracking(fields.tracking_number)?;

    if tracking.is_none() && invoice.is_none() {
        return Err(ApiError::bad_request(
            "Provide a tracking_number or a factura_compra",
        ));
    }

    let invoice_path = match invoice {
        Some(upload) => Some(state.media.save(&upload.filename, &upload.bytes).await?),
        None => None,
    };

    let attached = state
        .db
        .shipments()
        .attach_documents(id, tracking.as_deref(), invoice_path.as_deref(), Some(user.id))
        .await;
    let shipment = keep_invoice_if_ok(&state, invoice_path.as_deref(), attached).await?;

    info!(shipment_id = id, status = shipment.status.label(), "Shipment documents updated");
    Ok(Json(ShipmentDto::from(&shipment)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShipmentListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub estado: Option<String>,
}

/// `GET /api/shipping/`: newest first. Staff see every shipment.
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<ShipmentListQuery>,
) -> Result<Json<Page<ShipmentDto>>, ApiError> {
    let status = match non_blank(query.estado) {
        Some(text) => Some(ShipmentStatus::parse(&text)?),
        None => None,
    };
    let page = PageRequest::new(query.page, query.page_size);
    let shipments = state.db.shipments();

    let found = if user.is_staff {
        shipments.list_all(status, page).await?
    } else {
        let client = client_for(&state, &user).await?;
        shipments
            .list(
                ShipmentFilter {
                    client_id: Some(client.id),
                    status,
                },
                page,
            )
            .await?
    };

    Ok(Json(found.map(|shipment| ShipmentDto::from(&shipment))))
}

/// `GET /api/shipping/{id}/` with its status history.
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ShipmentDetail>, ApiError> {
    let shipment = load_shipment(&state, id).await?;
    ensure_owner_or_staff(&state, &user, Some(shipment.client_id)).await?;

    let history = state.db.shipments().history(id).await?;
    Ok(Json(ShipmentDetail {
        shipment: ShipmentDto::from(&shipment),
        historial: history.iter().map(StatusUpdateDto::from).collect(),
    }))
}

/// `POST /api/shipping/{id}/status/` (staff)
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<StatusChangeRequest>,
) -> Result<Json<ShipmentDto>, ApiError> {
    let (status, actual_weight) = req.validate()?;

    let change = StatusChange {
        status,
        location: non_blank(req.ubicacion).unwrap_or_default(),
        notes: non_blank(req.notas).unwrap_or_default(),
        actual_weight_hundredths: actual_weight.map(|w| w.hundredths()),
        updated_by: Some(staff.id),
    };

    let shipment = state.db.shipments().advance_status(id, &change).await?;
    Ok(Json(ShipmentDto::from(&shipment)))
}
