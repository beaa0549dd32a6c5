//! Parts catalog, order validation and order sheet download.

#![allow(clippy::unwrap_used)]

use duct_order_integration_tests::{TestApp, sample_order};
use serde_json::{Value, json};

#[tokio::test]
async fn test_parts_catalog() {
    let app = TestApp::spawn().await;

    let parts: Value = app.get("/api/parts").await.json().await.unwrap();
    let parts = parts.as_array().unwrap();
    assert!(!parts.is_empty());
    assert!(parts.iter().any(|p| p["key"] == "1-duz-kanal.png"));
}

#[tokio::test]
async fn test_validate_order() {
    let app = TestApp::spawn().await;

    let resp = app.post("/api/orders/validate", &sample_order()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["totalQuantity"], 2);

    let resp = app
        .post("/api/orders/validate", &json!({ "items": [] }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Sipariş listesi boş");

    let resp = app
        .post(
            "/api/orders/validate",
            &json!({ "items": [{ "id": "1", "partKey": "yok.png", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let resp = app
        .post(
            "/api/orders/validate",
            &json!({ "items": [{ "id": "1", "partKey": "1-duz-kanal.png", "quantity": 101 }] }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "1. kalem: adet 1 ile 100 arasında olmalıdır");
}

#[tokio::test]
async fn test_document_requires_login() {
    let app = TestApp::spawn().await;

    let resp = app.post("/api/orders/document", &sample_order()).await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_document_download() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    let resp = app.post("/api/orders/document", &sample_order()).await;
    assert_eq!(resp.status(), 200);

    let disposition = resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"siparis_"));
    assert!(disposition.ends_with(".txt\""));

    let text = resp.text().await.unwrap();
    assert!(text.contains("RECTANGULAR DUCT SİPARİŞİ"));
    assert!(text.contains("Müşteri: Ali Kaya"));
    assert!(text.contains("E-posta: ali@example.com"));
    assert!(text.contains("Düz Kanal"));
    assert!(text.contains("Notlar: Kat 2"));
}
