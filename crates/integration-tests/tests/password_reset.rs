//! Forgot and reset password.

#![allow(clippy::unwrap_used)]

use duct_order_integration_tests::TestApp;
use serde_json::{Value, json};

const SAME_MESSAGE: &str =
    "Eğer bu e-posta adresi kayıtlıysa, şifre sıfırlama bağlantısı gönderildi";

#[tokio::test]
async fn test_forgot_password_answers_the_same_for_unknown_email() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    for email in ["ali@example.com", "nobody@example.com"] {
        let resp = app
            .post("/api/forgot-password", &json!({ "email": email }))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], SAME_MESSAGE);
    }
}

#[tokio::test]
async fn test_reset_password_is_single_use() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;
    let token = app.reset_token_for("ali@example.com").await;

    let resp = app
        .post(
            "/api/reset-password",
            &json!({ "token": token, "newPassword": "yeniSifre1" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Şifreniz başarıyla güncellendi");

    let resp = app
        .post(
            "/api/reset-password",
            &json!({ "token": token, "newPassword": "baskaSifre2" }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Geçersiz veya kullanılmış token");

    let client = TestApp::new_client();
    let resp = client
        .post(app.url("/api/login"))
        .json(&json!({ "email": "ali@example.com", "password": "yeniSifre1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_reset_password_requires_fields() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/reset-password", &json!({ "token": "abc" }))
        .await;
    assert_eq!(resp.status(), 400);
}
