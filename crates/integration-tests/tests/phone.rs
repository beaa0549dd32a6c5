//! Phone sign-in with SMS codes (demo mode).

#![allow(clippy::unwrap_used)]

use duct_order_integration_tests::TestApp;
use duct_order_server::services::otp::OtpPurpose;
use serde_json::{Value, json};

const PHONE: &str = "0555 123 45 67";

async fn register_by_phone(app: &TestApp) -> Value {
    let resp = app
        .post("/api/phone/send-otp", &json!({ "phone": PHONE, "isLogin": false }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Doğrulama kodu gönderildi");
    assert_eq!(body["demo"], true);

    let code = app.otp_for(PHONE, OtpPurpose::Register).await;
    let resp = app
        .post(
            "/api/phone/register",
            &json!({ "phone": PHONE, "otp": code, "firstName": "Ayşe", "lastName": "Yılmaz" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_phone_registration_flow() {
    let app = TestApp::spawn().await;

    let body = register_by_phone(&app).await;
    assert_eq!(body["message"], "Kayıt başarılı");
    assert_eq!(body["user"]["phone"], "+905551234567");

    let me: Value = app.get("/api/me").await.json().await.unwrap();
    assert_eq!(me["user"]["firstName"], "Ayşe");
}

#[tokio::test]
async fn test_send_otp_checks_registration_state() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/phone/send-otp", &json!({ "phone": PHONE, "isLogin": true }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bu telefon numarası kayıtlı değil");

    register_by_phone(&app).await;

    let resp = app
        .post("/api/phone/send-otp", &json!({ "phone": PHONE, "isLogin": false }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bu telefon numarası zaten kayıtlı");
}

#[tokio::test]
async fn test_send_otp_requires_phone() {
    let app = TestApp::spawn().await;

    let resp = app.post("/api/phone/send-otp", &json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Telefon numarası gerekli");
}

#[tokio::test]
async fn test_phone_login_rejects_wrong_and_reused_codes() {
    let app = TestApp::spawn().await;
    register_by_phone(&app).await;
    let client = TestApp::new_client();

    let code = app.otp_for(PHONE, OtpPurpose::Login).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let resp = client
        .post(app.url("/api/phone/login"))
        .json(&json!({ "phone": PHONE, "otp": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Geçersiz doğrulama kodu");

    let resp = client
        .post(app.url("/api/phone/login"))
        .json(&json!({ "phone": PHONE, "otp": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Giriş başarılı");

    let resp = client
        .post(app.url("/api/phone/login"))
        .json(&json!({ "phone": PHONE, "otp": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Geçersiz veya süresi dolmuş kod");
}

#[tokio::test]
async fn test_register_code_cannot_log_in() {
    let app = TestApp::spawn().await;
    register_by_phone(&app).await;

    let code = app.otp_for(PHONE, OtpPurpose::Register).await;
    let resp = app
        .post("/api/phone/login", &json!({ "phone": PHONE, "otp": code }))
        .await;
    assert_eq!(resp.status(), 400);
}
