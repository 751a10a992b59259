//! Router tests for the landed-cost calculator and saved quotes.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};

use common::{request, TestApp};

fn article(tariff_id: i64) -> Value {
    json!({
        "partida_id": tariff_id,
        "valor": "100",
        "peso": 2,
        "descripcion": "Laptop 14 pulgadas",
    })
}

#[tokio::test]
async fn test_cotizar_returns_full_breakdown() {
    let app = TestApp::new().await;
    let laptop = app.laptop_tariff().await;

    let (status, body) = app.post("/api/cotizar/", None, article(laptop.id)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["valor_declarado"], "100.00");
    assert_eq!(data["costo_por_libra"], "2.50");
    assert_eq!(data["peso_a_usar"], "2.00");
    assert_eq!(data["costo_transporte"], "5.00");
    assert_eq!(data["valor_cif"], "105.00");
    assert_eq!(data["impuesto_dai"], "10.50");
    assert_eq!(data["impuesto_isv"], "17.33");
    assert_eq!(data["total_impuestos"], "27.83");
    assert_eq!(data["cargos_totales"], "32.83");
    assert_eq!(data["total_incluido_valor"], "132.83");
    assert_eq!(data["partida_item_no"], "8471.30.00.00");
    assert_eq!(data["descripcion_original"], "Laptop 14 pulgadas");

    // Bare decimals; the page adds "$" and "%" itself
    assert_eq!(data["porcentaje_dai"], "10.00");
    assert_eq!(data["porcentaje_isv"], "15.00");
}

#[tokio::test]
async fn test_cotizar_converts_kilograms() {
    let app = TestApp::new().await;
    let laptop = app.laptop_tariff().await;

    let (status, body) = app
        .post(
            "/api/cotizar/",
            None,
            json!({
                "partida_arancelaria": laptop.id,
                "valor_articulo": 100,
                "peso": "10",
                "unidad_peso": "kg",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["peso"], "22.05");
    assert_eq!(body["data"]["unidad_peso"], "kg");
}

#[tokio::test]
async fn test_cotizar_rejections() {
    let app = TestApp::new().await;
    let prohibited = app.prohibited_tariff().await;

    let (status, body) = app.post("/api/cotizar/", None, article(prohibited.id)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNPROCESSABLE");

    let (status, _) = app.post("/api/cotizar/", None, article(9999)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/api/cotizar/",
            None,
            json!({"valor": "-5", "peso": "abc", "unidad_peso": "oz"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = &body["error"]["fields"];
    assert!(fields["partida_id"].is_string());
    assert!(fields["valor"].is_string());
    assert!(fields["unidad_peso"].is_string());
}

#[tokio::test]
async fn test_cotizar_caps_oversized_input() {
    let app = TestApp::new().await;
    let laptop = app.laptop_tariff().await;

    let huge_sides = json!({
        "partida_id": laptop.id,
        "valor": 100,
        "peso": 2,
        "largo": "100000000000",
        "ancho": "100000000000",
        "alto": "100000000000",
    });
    let (status, body) = app.post("/api/cotizar/", None, huge_sides).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let fields = &body["error"]["fields"];
    assert!(fields["largo"].is_string());
    assert!(fields["ancho"].is_string());
    assert!(fields["alto"].is_string());

    let (status, body) = app
        .post(
            "/api/cotizar/",
            None,
            json!({"partida_id": laptop.id, "valor": "92233720368547758.07", "peso": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["fields"]["valor"], "valor must stay within 0..=1000000");

    let (status, body) = app
        .post(
            "/api/cotizar/",
            None,
            json!({"partida_id": laptop.id, "valor": 100, "peso": "99999999999", "unidad_peso": "kg"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"]["fields"]["peso"].is_string());

    // Right at the ceilings still quotes
    let (status, body) = app
        .post(
            "/api/cotizar/",
            None,
            json!({
                "partida_id": laptop.id,
                "valor": "1000000.00",
                "peso": "10000",
                "largo": "1000",
                "ancho": "1000",
                "alto": "1000",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["peso_a_usar"], "6024096.39");
}

#[tokio::test]
async fn test_oversized_body_gets_json_413() {
    let app = TestApp::new().await;
    let payload = json!({"partida_id": 1, "valor": 1, "peso": 1, "descripcion": "x".repeat(300 * 1024)})
        .to_string();

    // Declared length over the limit: refused before the handler runs
    let declared = Request::builder()
        .method(Method::POST)
        .uri("/api/cotizar/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, body) = app.send(declared).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

    // No length header: the limit trips while the JSON body is read
    let streamed = request(
        Method::POST,
        "/api/cotizar/",
        None,
        Some(serde_json::from_str(&payload).unwrap()),
    );
    let (status, body) = app.send(streamed).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_saved_quote_lifecycle() {
    let app = TestApp::new().await;
    let laptop = app.laptop_tariff().await;
    let token = app.customer_token("ana").await;

    let (status, quote) = app
        .post("/api/cotizaciones/", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quote["estado"], "Pendiente");
    assert_eq!(quote["total"], "0.00");
    let id = quote["id"].as_i64().unwrap();

    let (status, detail) = app
        .post(
            &format!("/api/cotizaciones/{}/articulos/", id),
            Some(&token),
            article(laptop.id),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{detail}");
    assert_eq!(detail["articulos"].as_array().unwrap().len(), 1);
    assert_eq!(detail["articulos"][0]["impuesto_isv"], "17.33");
    assert_eq!(detail["subtotal"], "100.00");
    assert_eq!(detail["flete"], "5.00");
    assert_eq!(detail["impuestos"], "27.83");
    assert_eq!(detail["total"], "132.83");

    let (status, listed) = app.get("/api/cotizaciones/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 1);

    let (status, accepted) = app
        .post(&format!("/api/cotizaciones/{}/aceptar/", id), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["estado"], "Aceptada");

    let (status, _) = app
        .post(&format!("/api/cotizaciones/{}/aceptar/", id), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            &format!("/api/cotizaciones/{}/articulos/", id),
            Some(&token),
            article(laptop.id),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, listed) = app
        .get("/api/cotizaciones/?estado=pendiente", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn test_quotes_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let owner = app.customer_token("ana").await;
    let other = app.customer_token("luis").await;
    let staff = app.staff_token().await;

    let (_, quote) = app.post("/api/cotizaciones/", Some(&owner), json!({})).await;
    let uri = format!("/api/cotizaciones/{}/", quote["id"]);

    let (status, _) = app.get(&uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.get("/api/cotizaciones/", Some(&other)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 0);

    let (status, _) = app.get(&uri, Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&uri, Some(&owner)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, Some(&owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
