//! # Wire Types
//!
//! JSON shapes exchanged with the web frontend. Field names are the Spanish
//! names the frontend already uses; amounts travel as two-decimal strings
//! (`"12.50"`), tariff rates as fractions (`"0.15"`).
//!
//! ```text
//! request JSON ──► *Request (serde) ──► validate() ──► core types
//!                                            │
//!                                            └── Vec<ValidationError> → 400
//!
//! core types ──► *Dto::from(&T) ──► response JSON
//! ```
//!
//! Response types derive `TS`; `cargo test` writes their TypeScript
//! definitions to `bindings/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use sicarga_core::validation::{
    parse_fixed, validate_declared_value, validate_package_side, validate_weight, FieldErrors,
};
use sicarga_core::{
    Client, CourierCategory, Dimensions, Money, ParameterType, QuoteBreakdown, QuoteInput, QuoteItem,
    QuoteStatus, Shipment, ShipmentStatus, StatusUpdate, SystemParameter, TariffItem, User,
    ValidationError, Weight, WeightUnit,
};

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn money(cents: i64) -> String {
    Money::from_cents(cents).to_decimal_string()
}

fn hundredths(value: i64) -> String {
    Weight::from_hundredths(value).to_decimal_string()
}

// =============================================================================
// Decimal Input
// =============================================================================

/// A decimal that arrives either as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalInput {
    pub fn text(&self) -> String {
        match self {
            DecimalInput::Number(n) => n.to_string(),
            DecimalInput::Text(s) => s.trim().to_string(),
        }
    }

    /// Blank text counts as absent.
    fn present(value: &Option<DecimalInput>) -> Option<String> {
        value.as_ref().map(|v| v.text()).filter(|t| !t.is_empty())
    }
}

fn required_text(field: &str, value: &Option<DecimalInput>) -> Result<String, ValidationError> {
    DecimalInput::present(value).ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

/// A side in hundredths of an inch; positive and bounded when given.
fn optional_side(field: &str, value: &Option<DecimalInput>) -> Result<Option<i64>, ValidationError> {
    let Some(text) = DecimalInput::present(value) else {
        return Ok(None);
    };
    let side = parse_fixed(field, &text, 2)?;
    validate_package_side(field, side).map(Some)
}

pub fn parse_weight_unit(text: Option<&str>) -> Result<WeightUnit, ValidationError> {
    match text.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("lb") | Some("lbs") => Ok(WeightUnit::Lb),
        Some("kg") => Ok(WeightUnit::Kg),
        Some(_) => Err(ValidationError::NotAllowed {
            field: "unidad_peso".to_string(),
            allowed: vec!["lb".to_string(), "kg".to_string()],
        }),
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        UserDto {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct AuthResponse {
    pub user: UserDto,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ClientSummary {
    pub id: i64,
    pub codigo_cliente: Option<String>,
    pub nombre_completo: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MeResponse {
    pub user: UserDto,
    pub cliente: Option<ClientSummary>,
}

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ClientDto {
    pub id: i64,
    pub codigo_cliente: Option<String>,
    pub nombres: String,
    pub apellidos: String,
    pub nombre_corto: String,
    pub telefono: String,
    pub correo_electronico: String,
    pub direccion: String,
    pub ciudad: String,
    pub departamento: String,
    pub pais: String,
    pub fecha_registro: String,
}

impl From<&Client> for ClientDto {
    fn from(client: &Client) -> Self {
        ClientDto {
            id: client.id,
            codigo_cliente: client.client_code.clone(),
            nombres: client.first_names.clone(),
            apellidos: client.last_names.clone(),
            nombre_corto: client.short_name.clone(),
            telefono: client.phone.clone(),
            correo_electronico: client.email.clone(),
            direccion: client.address.clone(),
            ciudad: client.city.clone(),
            departamento: client.department.clone(),
            pais: client.country.clone(),
            fecha_registro: timestamp(client.registered_at),
        }
    }
}

/// Contact fields a client edits on `PATCH /api/clientes/me/`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub ciudad: Option<String>,
    pub departamento: Option<String>,
}

impl ContactRequest {
    pub fn validate(self) -> Result<sicarga_core::ContactUpdate, Vec<ValidationError>> {
        use sicarga_core::validation::validate_max_len;

        let mut errors = FieldErrors::new();
        for (field, value, max) in [
            ("telefono", &self.telefono, 20),
            ("direccion", &self.direccion, 255),
            ("ciudad", &self.ciudad, 100),
            ("departamento", &self.departamento, 100),
        ] {
            if let Some(value) = value {
                errors.check(validate_max_len(field, value, max));
            }
        }
        errors.into_result()?;

        Ok(sicarga_core::ContactUpdate {
            phone: self.telefono,
            address: self.direccion,
            city: self.ciudad,
            department: self.departamento,
        })
    }
}

// =============================================================================
// Tariff Items
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct TariffItemDto {
    pub id: i64,
    pub item_no: String,
    pub descripcion: String,
    pub partida_arancelaria: String,
    pub impuesto_dai: String,
    pub impuesto_isc: String,
    pub impuesto_ispc: String,
    pub impuesto_isv: String,
    pub courier_category: CourierCategory,
    pub restrictions: Vec<String>,
    pub package_type: String,
    pub requires_special_handling: bool,
    pub special_instructions: String,
    pub max_weight_allowed: Option<String>,
    pub search_keywords: Vec<String>,
    pub chapter_code: Option<String>,
    pub heading_code: Option<String>,
    pub parent_code: Option<String>,
    pub hierarchy_level: i64,
    pub is_leaf: bool,
    /// `"Laptops [15.00%]"`
    pub etiqueta: String,
}

impl From<&TariffItem> for TariffItemDto {
    fn from(item: &TariffItem) -> Self {
        let rates = item.rates();
        TariffItemDto {
            id: item.id,
            item_no: item.item_no.clone(),
            descripcion: item.description.clone(),
            partida_arancelaria: item.tariff_code.clone(),
            impuesto_dai: rates.dai.fraction_string(),
            impuesto_isc: rates.isc.fraction_string(),
            impuesto_ispc: rates.ispc.fraction_string(),
            impuesto_isv: rates.isv.fraction_string(),
            courier_category: item.courier_category,
            restrictions: item.restrictions.clone(),
            package_type: item.package_type.clone(),
            requires_special_handling: item.requires_special_handling,
            special_instructions: item.special_instructions.clone(),
            max_weight_allowed: item.max_weight().map(|w| w.to_decimal_string()),
            search_keywords: item.search_keywords.clone(),
            chapter_code: item.chapter_code.clone(),
            heading_code: item.heading_code.clone(),
            parent_code: item.parent_code.clone(),
            hierarchy_level: item.hierarchy_level,
            is_leaf: item.is_leaf,
            etiqueta: item.display_label(),
        }
    }
}

/// Staff create/replace body for `/api/partidas/`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TariffItemRequest {
    pub item_no: String,
    pub descripcion: String,
    pub partida_arancelaria: Option<String>,
    pub impuesto_dai: Option<DecimalInput>,
    pub impuesto_isc: Option<DecimalInput>,
    pub impuesto_ispc: Option<DecimalInput>,
    pub impuesto_isv: Option<DecimalInput>,
    pub courier_category: Option<String>,
    pub restrictions: Vec<String>,
    pub package_type: Option<String>,
    pub requires_special_handling: bool,
    pub special_instructions: String,
    pub max_weight_allowed: Option<DecimalInput>,
    pub search_keywords: Vec<String>,
}

impl TariffItemRequest {
    /// Builds the item to store. Missing rates are zero.
    pub fn validate(self) -> Result<TariffItem, Vec<ValidationError>> {
        use sicarga_core::tariff::{TaxRate, DEFAULT_PACKAGE_TYPE};
        use sicarga_core::validation::{validate_max_len, validate_required};
        use sicarga_core::TariffRates;

        let mut errors = FieldErrors::new();

        let item_no = errors.check(validate_required("item_no", &self.item_no));
        if let Some(item_no) = &item_no {
            errors.check(validate_max_len("item_no", item_no, 20));
        }
        let description = errors.check(validate_required("descripcion", &self.descripcion));

        let mut rate = |field: &str, value: &Option<DecimalInput>| -> TaxRate {
            match DecimalInput::present(value) {
                Some(text) => errors
                    .check(TaxRate::parse_fraction(field, &text))
                    .unwrap_or(TaxRate::zero()),
                None => TaxRate::zero(),
            }
        };
        let rates = TariffRates {
            dai: rate("impuesto_dai", &self.impuesto_dai),
            isc: rate("impuesto_isc", &self.impuesto_isc),
            ispc: rate("impuesto_ispc", &self.impuesto_ispc),
            isv: rate("impuesto_isv", &self.impuesto_isv),
        };

        let courier_category = match self.courier_category.as_deref() {
            Some(text) => errors.check(CourierCategory::parse(text)).unwrap_or_default(),
            None => CourierCategory::Allowed,
        };

        let max_weight = match DecimalInput::present(&self.max_weight_allowed) {
            Some(text) => errors
                .check(Weight::parse("max_weight_allowed", &text, WeightUnit::Lb))
                .map(|w| w.hundredths()),
            None => None,
        };

        errors.into_result()?;
        let (Some(item_no), Some(description)) = (item_no, description) else {
            return Err(vec![ValidationError::Required {
                field: "item_no".to_string(),
            }]);
        };

        let mut item = TariffItem::new(item_no, description, rates);
        if let Some(code) = self.partida_arancelaria.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
            item.tariff_code = code;
        }
        item.courier_category = courier_category;
        item.restrictions = self.restrictions;
        item.package_type = self
            .package_type
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_string());
        item.requires_special_handling = self.requires_special_handling;
        item.special_instructions = self.special_instructions.trim().to_string();
        item.max_weight_hundredths = max_weight;
        item.search_keywords = self
            .search_keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Ok(item)
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct AutocompleteResult {
    pub id: i64,
    /// `"item_no - descripcion"`
    pub text: String,
    pub codigo: String,
    pub descripcion: String,
    pub keywords: Vec<String>,
    pub score: f64,
}

/// `{results: [...]}` envelope of the search endpoints.
#[derive(Debug, Serialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

// =============================================================================
// Quote Calculation
// =============================================================================

/// Body of `POST /api/cotizar/` and `POST /api/cotizaciones/{id}/articulos/`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteRequest {
    #[serde(alias = "partida_arancelaria")]
    pub partida_id: Option<i64>,
    #[serde(alias = "valor_articulo")]
    pub valor: Option<DecimalInput>,
    pub peso: Option<DecimalInput>,
    pub unidad_peso: Option<String>,
    pub largo: Option<DecimalInput>,
    pub ancho: Option<DecimalInput>,
    pub alto: Option<DecimalInput>,
    #[serde(alias = "descripcion_original")]
    pub descripcion: Option<String>,
}

/// A validated article, ready for the calculator.
#[derive(Debug, Clone)]
pub struct ArticleInput {
    pub tariff_id: i64,
    pub input: QuoteInput,
    pub unit: WeightUnit,
    pub description: String,
}

impl QuoteRequest {
    pub fn validate(&self) -> Result<ArticleInput, Vec<ValidationError>> {
        let mut errors = FieldErrors::new();

        let tariff_id = self.partida_id;
        if tariff_id.is_none() {
            errors.push(ValidationError::Required {
                field: "partida_id".to_string(),
            });
        }

        let declared_value = errors
            .check(required_text("valor", &self.valor))
            .and_then(|text| errors.check(Money::parse_decimal("valor", &text)))
            .and_then(|value| errors.check(validate_declared_value("valor", value)));

        let unit = errors.check(parse_weight_unit(self.unidad_peso.as_deref()));
        let weight = match unit {
            Some(unit) => errors
                .check(required_text("peso", &self.peso))
                .and_then(|text| errors.check(Weight::parse("peso", &text, unit)))
                .and_then(|w| errors.check(validate_weight("peso", w))),
            None => None,
        };

        let length = errors.check(optional_side("largo", &self.largo)).flatten();
        let width = errors.check(optional_side("ancho", &self.ancho)).flatten();
        let height = errors.check(optional_side("alto", &self.alto)).flatten();

        let description = self.descripcion.as_deref().unwrap_or("").trim().to_string();
        if description.chars().count() > 255 {
            errors.push(ValidationError::TooLong {
                field: "descripcion".to_string(),
                max: 255,
            });
        }

        errors.into_result()?;
        match (tariff_id, declared_value, weight, unit) {
            (Some(tariff_id), Some(declared_value), Some(weight), Some(unit)) => Ok(ArticleInput {
                tariff_id,
                input: QuoteInput {
                    declared_value,
                    weight,
                    dimensions: Dimensions::from_optional(length, width, height),
                },
                unit,
                description,
            }),
            _ => Err(vec![ValidationError::Required {
                field: "peso".to_string(),
            }]),
        }
    }
}

/// Result of `POST /api/cotizar/`.
///
/// Amounts and `porcentaje_*` are bare decimals (`"2.50"`, `"15.00"`), the
/// same as every other amount in the API. The cotizador page adds the `$`
/// and `%` when it renders them.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct QuoteCalculation {
    pub valor_declarado: String,
    pub valor_cif: String,
    /// Scale weight in pounds, after any kg conversion.
    pub peso: String,
    pub unidad_peso: WeightUnit,
    pub peso_volumetrico: String,
    pub peso_a_usar: String,
    pub costo_por_libra: String,
    pub costo_transporte: String,
    pub impuesto_dai: String,
    pub impuesto_isc: String,
    pub impuesto_ispc: String,
    pub impuestos_importacion: String,
    pub impuesto_isv: String,
    pub total_impuestos: String,
    pub cargos_totales: String,
    pub total_incluido_valor: String,
    pub porcentaje_dai: String,
    pub porcentaje_isc: String,
    pub porcentaje_ispc: String,
    pub porcentaje_isv: String,
    pub partida_id: i64,
    pub partida_item_no: String,
    pub partida_descripcion: String,
    pub partida_arancelaria_numero: String,
    pub descripcion_original: String,
    /// Until when the browser may keep this result.
    pub valido_hasta: String,
}

impl QuoteCalculation {
    pub fn new(article: &ArticleInput, item: &TariffItem, breakdown: &QuoteBreakdown, cache_until: DateTime<Utc>) -> Self {
        let rates = item.rates();
        QuoteCalculation {
            valor_declarado: breakdown.declared_value.to_decimal_string(),
            valor_cif: breakdown.cif_value.to_decimal_string(),
            peso: breakdown.weight.to_decimal_string(),
            unidad_peso: article.unit,
            peso_volumetrico: breakdown.volumetric_weight.to_decimal_string(),
            peso_a_usar: breakdown.chargeable_weight.to_decimal_string(),
            costo_por_libra: breakdown.freight_rate.to_decimal_string(),
            costo_transporte: breakdown.freight.to_decimal_string(),
            impuesto_dai: breakdown.dai.to_decimal_string(),
            impuesto_isc: breakdown.isc.to_decimal_string(),
            impuesto_ispc: breakdown.ispc.to_decimal_string(),
            impuestos_importacion: breakdown.import_duties.to_decimal_string(),
            impuesto_isv: breakdown.isv.to_decimal_string(),
            total_impuestos: breakdown.total_taxes.to_decimal_string(),
            cargos_totales: breakdown.total_charges.to_decimal_string(),
            total_incluido_valor: breakdown.total_with_value.to_decimal_string(),
            porcentaje_dai: rates.dai.percent_string(),
            porcentaje_isc: rates.isc.percent_string(),
            porcentaje_ispc: rates.ispc.percent_string(),
            porcentaje_isv: rates.isv.percent_string(),
            partida_id: item.id,
            partida_item_no: item.item_no.clone(),
            partida_descripcion: item.display_label(),
            partida_arancelaria_numero: item.tariff_code.clone(),
            descripcion_original: article.description.clone(),
            valido_hasta: timestamp(cache_until),
        }
    }
}

/// `{success: true, data: ...}` envelope of the public calculator.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct QuoteCalculationResponse {
    pub success: bool,
    pub data: QuoteCalculation,
}

// =============================================================================
// Quotes
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct QuoteItemDto {
    pub id: i64,
    pub descripcion_original: String,
    pub partida_arancelaria: Option<i64>,
    pub valor_articulo: String,
    pub largo: String,
    pub ancho: String,
    pub alto: String,
    pub peso: String,
    pub peso_volumetrico: String,
    pub costo_flete_por_lb: String,
    pub costo_transporte: String,
    pub impuesto_dai: String,
    pub impuesto_isc: String,
    pub impuesto_ispc: String,
    pub impuesto_isv: String,
    pub impuesto_total: String,
}

impl From<&QuoteItem> for QuoteItemDto {
    fn from(item: &QuoteItem) -> Self {
        QuoteItemDto {
            id: item.id,
            descripcion_original: item.original_description.clone(),
            partida_arancelaria: item.tariff_item_id,
            valor_articulo: money(item.declared_value_cents),
            largo: hundredths(item.length_hundredths),
            ancho: hundredths(item.width_hundredths),
            alto: hundredths(item.height_hundredths),
            peso: hundredths(item.weight_hundredths),
            peso_volumetrico: hundredths(item.volumetric_weight_hundredths),
            costo_flete_por_lb: money(item.freight_rate_cents),
            costo_transporte: money(item.freight_cents),
            impuesto_dai: money(item.dai_cents),
            impuesto_isc: money(item.isc_cents),
            impuesto_ispc: money(item.ispc_cents),
            impuesto_isv: money(item.isv_cents),
            impuesto_total: money(item.total_tax_cents),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct QuoteDto {
    pub id: i64,
    pub cliente: Option<i64>,
    pub fecha_creacion: String,
    pub fecha_expiracion: String,
    /// Effective status: pending quotes past expiry read `Expirada`.
    pub estado: QuoteStatus,
    pub subtotal: String,
    pub flete: String,
    pub impuestos: String,
    pub total: String,
}

impl QuoteDto {
    pub fn new(quote: &sicarga_core::Quote, now: DateTime<Utc>) -> Self {
        QuoteDto {
            id: quote.id,
            cliente: quote.client_id,
            fecha_creacion: timestamp(quote.created_at),
            fecha_expiracion: timestamp(quote.expires_at),
            estado: quote.effective_status(now),
            subtotal: quote.subtotal().to_decimal_string(),
            flete: quote.freight().to_decimal_string(),
            impuestos: quote.taxes().to_decimal_string(),
            total: quote.total().to_decimal_string(),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: QuoteDto,
    pub articulos: Vec<QuoteItemDto>,
}

// =============================================================================
// Shipping
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ShipmentDto {
    pub id: i64,
    pub cotizacion: Option<i64>,
    pub cliente: i64,
    pub tracking_number_original: Option<String>,
    pub tracking_number_sicarga: String,
    pub estado_envio: ShipmentStatus,
    pub peso_estimado: String,
    pub peso_real: Option<String>,
    pub factura_compra: Option<String>,
    pub direccion_entrega: String,
    pub instrucciones_especiales: String,
    pub fecha_solicitud: String,
    pub fecha_recepcion_miami: Option<String>,
    pub fecha_salida_miami: Option<String>,
    pub fecha_llegada_honduras: Option<String>,
    pub fecha_liberacion_aduana: Option<String>,
    pub fecha_entrega: Option<String>,
    pub fecha_actualizacion: String,
}

impl From<&Shipment> for ShipmentDto {
    fn from(s: &Shipment) -> Self {
        ShipmentDto {
            id: s.id,
            cotizacion: s.quote_id,
            cliente: s.client_id,
            tracking_number_original: s.original_tracking_number.clone(),
            tracking_number_sicarga: s.internal_tracking_number.clone(),
            estado_envio: s.status,
            peso_estimado: s.estimated_weight().to_decimal_string(),
            peso_real: s.actual_weight_hundredths.map(hundredths),
            factura_compra: s.invoice_path.clone(),
            direccion_entrega: s.delivery_address.clone(),
            instrucciones_especiales: s.special_instructions.clone(),
            fecha_solicitud: timestamp(s.requested_at),
            fecha_recepcion_miami: s.received_miami_at.map(timestamp),
            fecha_salida_miami: s.departed_miami_at.map(timestamp),
            fecha_llegada_honduras: s.arrived_honduras_at.map(timestamp),
            fecha_liberacion_aduana: s.customs_released_at.map(timestamp),
            fecha_entrega: s.delivered_at.map(timestamp),
            fecha_actualizacion: timestamp(s.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct StatusUpdateDto {
    pub estado_anterior: Option<ShipmentStatus>,
    pub estado_nuevo: ShipmentStatus,
    pub ubicacion: String,
    pub notas: String,
    pub fecha: String,
}

impl From<&StatusUpdate> for StatusUpdateDto {
    fn from(u: &StatusUpdate) -> Self {
        StatusUpdateDto {
            estado_anterior: u.previous_status,
            estado_nuevo: u.new_status,
            ubicacion: u.location.clone(),
            notas: u.notes.clone(),
            fecha: timestamp(u.created_at),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ShipmentDetail {
    #[serde(flatten)]
    pub shipment: ShipmentDto,
    pub historial: Vec<StatusUpdateDto>,
}

/// Staff body for `POST /api/shipping/{id}/status/`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusChangeRequest {
    pub estado: String,
    pub ubicacion: Option<String>,
    pub notas: Option<String>,
    pub peso_real: Option<DecimalInput>,
}

impl StatusChangeRequest {
    pub fn validate(&self) -> Result<(ShipmentStatus, Option<Weight>), Vec<ValidationError>> {
        let mut errors = FieldErrors::new();

        let status = if self.estado.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: "estado".to_string(),
            });
            None
        } else {
            errors.check(ShipmentStatus::parse(&self.estado))
        };

        let weight = match DecimalInput::present(&self.peso_real) {
            Some(text) => errors
                .check(Weight::parse("peso_real", &text, WeightUnit::Lb))
                .and_then(|w| errors.check(validate_weight("peso_real", w))),
            None => None,
        };

        errors.into_result()?;
        match status {
            Some(status) => Ok((status, weight)),
            None => Err(vec![ValidationError::Required {
                field: "estado".to_string(),
            }]),
        }
    }
}

// =============================================================================
// Parameters & Mailbox
// =============================================================================

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ParameterDto {
    pub nombre_parametro: String,
    pub valor: String,
    pub tipo_dato: ParameterType,
    pub fecha_actualizacion: String,
}

impl From<&SystemParameter> for ParameterDto {
    fn from(p: &SystemParameter) -> Self {
        ParameterDto {
            nombre_parametro: p.name.clone(),
            valor: p.value.clone(),
            tipo_dato: p.data_type,
            fecha_actualizacion: timestamp(p.updated_at),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParameterUpdateRequest {
    pub valor: String,
    /// Only needed when creating a new parameter.
    pub tipo_dato: Option<ParameterType>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct PublicParameters {
    pub direccion_consolidador: String,
    pub direccion_oficina: String,
    pub whatsapp_oficina: String,
    pub telefono_oficina: String,
    pub entrega_a_domicilio: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct OfficeContact {
    pub direccion: String,
    pub telefono: String,
    pub whatsapp: String,
    pub whatsapp_url: String,
    pub google_maps_url: String,
    pub waze_url: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MailboxResponse {
    pub cliente: ClientSummary,
    /// Text the customer pastes as shipping address at checkout.
    pub direccion_casillero: String,
    pub direccion_consolidador: String,
    pub oficina: OfficeContact,
    pub entrega_a_domicilio: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> QuoteRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_decimal_input_accepts_numbers_and_text() {
        let req = request(serde_json::json!({"partida_id": 1, "valor": 250, "peso": "2.5"}));
        let article = req.validate().unwrap();
        assert_eq!(article.input.declared_value, Money::from_cents(25_000));
        assert_eq!(article.input.weight, Weight::from_hundredths(250));
        assert_eq!(article.input.dimensions, Dimensions::unit());
        assert_eq!(article.unit, WeightUnit::Lb);
    }

    #[test]
    fn test_kilograms_become_pounds() {
        let req = request(serde_json::json!({
            "partida_id": 1, "valor": "100", "peso": 10, "unidad_peso": "KG"
        }));
        let article = req.validate().unwrap();
        assert_eq!(article.input.weight.hundredths(), 2205);
        assert_eq!(article.unit, WeightUnit::Kg);
    }

    #[test]
    fn test_original_field_names_accepted() {
        let req = request(serde_json::json!({
            "partida_arancelaria": 4, "valor_articulo": "10.00", "peso": "1",
            "descripcion_original": "Audífonos", "largo": 10, "ancho": "5.5", "alto": 2
        }));
        let article = req.validate().unwrap();
        assert_eq!(article.tariff_id, 4);
        assert_eq!(article.description, "Audífonos");
        assert_eq!(article.input.dimensions, Dimensions::new(1000, 550, 200));
    }

    #[test]
    fn test_collects_every_field_error() {
        let req = request(serde_json::json!({"valor": "1.234", "peso": "-1", "alto": 0}));
        let errors = req.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
        assert!(fields.contains(&"partida_id"));
        assert!(fields.contains(&"valor"));
        assert!(fields.contains(&"peso"));
        assert!(fields.contains(&"alto"));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let req = request(serde_json::json!({"partida_id": 1, "valor": 1, "peso": 1, "unidad_peso": "oz"}));
        let errors = req.validate().unwrap_err();
        assert_eq!(errors[0].field(), "unidad_peso");
    }

    #[test]
    fn test_tariff_request_builds_item() {
        let req: TariffItemRequest = serde_json::from_value(serde_json::json!({
            "item_no": "8471.30.00.00",
            "descripcion": "Laptops",
            "impuesto_isv": "0.15",
            "courier_category": "restricted",
            "max_weight_allowed": "44",
            "search_keywords": ["laptop", " ", "notebook"]
        }))
        .unwrap();

        let item = req.validate().unwrap();
        assert_eq!(item.isv_bps, 1500);
        assert_eq!(item.dai_bps, 0);
        assert_eq!(item.courier_category, CourierCategory::Restricted);
        assert_eq!(item.max_weight_hundredths, Some(4400));
        assert_eq!(item.search_keywords, vec!["laptop", "notebook"]);
        assert_eq!(item.tariff_code, "8471.30.00.00");
    }

    #[test]
    fn test_tariff_request_rejects_rate_above_one() {
        let req: TariffItemRequest = serde_json::from_value(serde_json::json!({
            "item_no": "0101", "descripcion": "Caballos", "impuesto_dai": 1.5
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors[0].field(), "impuesto_dai");
    }

    #[test]
    fn test_status_change_parses_label() {
        let req = StatusChangeRequest {
            estado: "en aduana".to_string(),
            peso_real: Some(DecimalInput::Text("3.10".to_string())),
            ..Default::default()
        };
        let (status, weight) = req.validate().unwrap();
        assert_eq!(status, ShipmentStatus::InCustoms);
        assert_eq!(weight, Some(Weight::from_hundredths(310)));

        let bad = StatusChangeRequest::default().validate().unwrap_err();
        assert_eq!(bad[0].field(), "estado");
    }
}
