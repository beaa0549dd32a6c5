//! Email registration, login, session and logout.

#![allow(clippy::unwrap_used)]

use duct_order_integration_tests::{PASSWORD, TestApp};
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::spawn().await;

    let body = app.register("ali@example.com").await;
    assert_eq!(body["message"], "Kayıt başarılı");
    assert_eq!(body["user"]["email"], "ali@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());

    let me: Value = app.get("/api/me").await.json().await.unwrap();
    assert_eq!(me["user"]["firstName"], "Ali");
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    let resp = app
        .post(
            "/api/register",
            &json!({
                "email": "ALI@example.com",
                "password": PASSWORD,
                "firstName": "Ali",
                "lastName": "Kaya",
            }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bu e-posta adresi zaten kayıtlı");
}

#[tokio::test]
async fn test_register_requires_all_fields() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/register", &json!({ "email": "a@example.com" }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Tüm alanlar gerekli");
}

#[tokio::test]
async fn test_register_enforces_password_policy() {
    let app = TestApp::spawn().await;

    let resp = app
        .post(
            "/api/register",
            &json!({
                "email": "ali@example.com",
                "password": PASSWORD.to_lowercase(),
                "firstName": "Ali",
                "lastName": "Kaya",
            }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Şifre en az bir küçük harf, bir büyük harf ve bir rakam içermelidir"
    );

    let resp = app.get("/api/me").await;
    assert_eq!(resp.status(), 401);

    app.register("ali@example.com").await;
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    let other = TestApp::new_client();
    let resp = other
        .post(app.url("/api/login"))
        .json(&json!({ "email": "ali@example.com", "password": "yanlis99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Geçersiz e-posta veya şifre");

    let resp = other
        .post(app.url("/api/login"))
        .json(&json!({ "email": "ali@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Giriş başarılı");

    let resp = other.get(app.url("/api/me")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    let resp = app.post("/api/logout", &json!({})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Başarıyla çıkış yapıldı");

    let resp = app.get("/api/me").await;
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Oturum açılmamış");
}

#[tokio::test]
async fn test_google_not_configured() {
    let app = TestApp::spawn().await;

    let body: Value = app
        .get("/api/auth/google/status")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["configured"], false);
    assert_eq!(body["message"], "Google OAuth is not configured");

    let resp = app.get("/api/auth/google").await;
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Google OAuth not configured");
}
