//! # SicargaBox API
//!
//! REST server behind the SicargaBox web frontend: tariff lookup, the
//! public landed-cost calculator, customer mailboxes and shipping requests.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SicargaBox API                                 │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  CorsLayer → TraceLayer → 413 as JSON → RequestBodyLimitLayer    │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  │                                      │
//! │  ┌────────────────┐  ┌───────────▼────┐  ┌────────────────────────────┐│
//! │  │  auth          │  │  partidas      │  │  cotizar / cotizaciones    ││
//! │  │ • register     │  │ • list / CRUD  │  │ • public calculator        ││
//! │  │ • login        │  │ • search       │  │ • quotes + articles        ││
//! │  │ • refresh      │  │ • autocomplete │  │ • accept                   ││
//! │  │ • logout / me  │  │ • requirements │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  clientes      │  │  shipping      │  │  parametros / casillero    ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Database (SQLite) • JwtManager • InvoiceStore • config │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Every key can be set as `SICARGA_<KEY>`:
//! - `SICARGA_JWT_SECRET` - HS256 secret, at least 32 bytes (required)
//! - `SICARGA_DATABASE_PATH` - SQLite file (default: sicarga.db)
//! - `SICARGA_PORT` - HTTP port (default: 8000)
//! - `SICARGA_CORS_ORIGINS` - comma-separated browser origins
//! - `SICARGA_MEDIA_DIR` - invoice upload root (default: media)

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod media;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{auth as auth_routes, clients, health, parameters, quotes, shipping, tariffs};
use crate::media::InvoiceStore;
use sicarga_db::Database;

/// Room for multipart framing and the text fields next to the invoice.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: ApiConfig,
    pub media: InvoiceStore,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(
            &config.jwt_secret,
            config.access_lifetime(),
            config.refresh_lifetime(),
        );
        let media = InvoiceStore::new(config.media_dir.clone(), config.max_upload_bytes);

        AppState {
            db,
            jwt,
            config,
            media,
        }
    }
}

/// Builds the full router with middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(api_routes())
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::map_response(render_body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `RequestBodyLimitLayer` answers an oversized `Content-Length` with a
/// plain-text 413; give it the JSON error body every other route uses.
async fn render_body_limit(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|ct| ct.as_bytes().starts_with(b"application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return ApiError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
            .into_response();
    }
    response
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/api/auth/register/", post(auth_routes::register))
        .route("/api/auth/login/", post(auth_routes::login))
        .route("/api/auth/refresh/", post(auth_routes::refresh))
        .route("/api/auth/logout/", post(auth_routes::logout))
        .route("/api/auth/me/", get(auth_routes::me))
        // Tariffs
        .route("/api/partidas/", get(tariffs::list).post(tariffs::create))
        .route("/api/partidas/search_products/", get(tariffs::search_products))
        .route(
            "/api/partidas/{id}/",
            get(tariffs::get).put(tariffs::update).delete(tariffs::delete),
        )
        .route("/api/partidas/{id}/requirements/", get(tariffs::requirements))
        .route("/api/buscar-partidas/", get(tariffs::autocomplete))
        // Quotes
        .route("/api/cotizar/", post(quotes::calculate))
        .route("/api/cotizaciones/", get(quotes::list).post(quotes::create))
        .route("/api/cotizaciones/{id}/", get(quotes::get).delete(quotes::delete))
        .route("/api/cotizaciones/{id}/articulos/", post(quotes::add_item))
        .route("/api/cotizaciones/{id}/aceptar/", post(quotes::accept))
        // Clients
        .route("/api/clientes/", get(clients::list))
        .route("/api/clientes/me/", get(clients::me).patch(clients::update_me))
        .route("/api/clientes/{id}/", get(clients::get))
        // Shipping
        .route("/api/shipping/", get(shipping::list))
        .route("/api/shipping/request/", post(shipping::request))
        .route("/api/shipping/update/{id}/", patch(shipping::update))
        .route("/api/shipping/{id}/", get(shipping::get))
        .route("/api/shipping/{id}/status/", post(shipping::change_status))
        // Parameters and mailbox
        .route("/api/parametros/", get(parameters::list))
        .route("/api/parametros/publicos/", get(parameters::public))
        .route("/api/parametros/{nombre}/", put(parameters::update))
        .route("/api/casillero/", get(parameters::mailbox))
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}
