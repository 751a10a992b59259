//! Shared helpers for router tests: an in-memory database, a throwaway
//! media directory and small request builders.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use sicarga_api::config::ApiConfig;
use sicarga_api::{build_router, AppState};
use sicarga_core::{CourierCategory, NewUser, TariffItem, TariffRates, TaxRate};
use sicarga_db::{hash_password, Database, DbConfig};

pub const PASSWORD: &str = "Cargamento#2024";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    _media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            jwt_secret: "integration-test-secret-0123456789".to_string(),
            media_dir: media.path().to_path_buf(),
            max_upload_bytes: 64 * 1024,
            ..ApiConfig::default()
        };

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.parameters().seed_defaults().await.unwrap();

        let state = Arc::new(AppState::new(db, config));
        let router = build_router(state.clone());

        TestApp {
            state,
            router,
            _media: media,
        }
    }

    /// Sends a request and returns the status with the JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    /// Registers a customer and returns the response body.
    pub async fn register(&self, username: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/register/",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "password2": PASSWORD,
                    "first_name": "Ana María",
                    "last_name": "Reyes Castro",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    /// Registers a customer and returns their access token.
    pub async fn customer_token(&self, username: &str) -> String {
        self.register(username).await["access"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Creates a staff account directly and logs it in.
    pub async fn staff_token(&self) -> String {
        self.state
            .db
            .users()
            .create(&NewUser {
                username: "operador".to_string(),
                email: "operador@sicargabox.com".to_string(),
                first_name: "Operador".to_string(),
                last_name: "Bodega".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                is_staff: true,
            })
            .await
            .unwrap();

        let (status, body) = self
            .post(
                "/api/auth/login/",
                None,
                json!({"username": "operador", "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access"].as_str().unwrap().to_string()
    }

    /// Laptops: DAI 10%, ISV 15%.
    pub async fn laptop_tariff(&self) -> TariffItem {
        let rates = TariffRates {
            dai: TaxRate::from_bps(1000),
            isv: TaxRate::from_bps(1500),
            ..Default::default()
        };
        let mut item = TariffItem::new("8471.30.00.00", "Computadoras portátiles laptop", rates);
        item.search_keywords = vec!["laptop".to_string(), "notebook".to_string()];
        self.state.db.tariffs().insert(&item).await.unwrap()
    }

    pub async fn prohibited_tariff(&self) -> TariffItem {
        let mut item = TariffItem::new("9303.20.00.00", "Escopetas de caza", TariffRates::default());
        item.courier_category = CourierCategory::Prohibited;
        self.state.db.tariffs().insert(&item).await.unwrap()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub const BOUNDARY: &str = "sicarga-test-boundary";

/// A `multipart/form-data` request with text fields and an optional file.
pub fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
