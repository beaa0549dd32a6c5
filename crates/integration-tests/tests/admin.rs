//! Admin dashboard access control and role management.

#![allow(clippy::unwrap_used)]

use duct_order_integration_tests::{TestApp, sample_order};
use serde_json::{Value, json};

#[tokio::test]
async fn test_admin_requires_login() {
    let app = TestApp::spawn().await;

    for path in ["/api/admin/analytics", "/api/admin/users"] {
        let resp = app.get(path).await;
        assert_eq!(resp.status(), 401, "{path}");
    }
}

#[tokio::test]
async fn test_admin_rejects_regular_users() {
    let app = TestApp::spawn().await;
    app.register("ali@example.com").await;

    let resp = app.get("/api/admin/analytics").await;
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bu işlem için yetkiniz yok");
}

#[tokio::test]
async fn test_analytics_summary() {
    let app = TestApp::spawn().await;
    app.register("admin@example.com").await;
    app.promote("admin@example.com").await;

    let resp = app.post("/api/orders/document", &sample_order()).await;
    assert_eq!(resp.status(), 200);
    app.post("/api/track", &json!({ "action": "page_view" }))
        .await;

    let resp = app.get("/api/admin/analytics").await;
    assert_eq!(resp.status(), 200);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["totalUsers"], 1);
    assert_eq!(summary["activity"]["pdfDownloads"], 1);
    assert_eq!(summary["activity"]["pageViews"], 1);
    assert_eq!(summary["totalEvents"], 3);

    let stats = summary["userStats"].as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["contact"], "admin@example.com");
    assert_eq!(stats[0]["pdfDownloads"], 1);
}

#[tokio::test]
async fn test_set_role() {
    let app = TestApp::spawn().await;
    let other = app.register("ali@example.com").await;
    let other_id = other["user"]["id"].as_str().unwrap().to_string();

    app.post("/api/logout", &json!({})).await;
    let admin = app.register("admin@example.com").await;
    let admin_id = admin["user"]["id"].as_str().unwrap().to_string();
    app.promote("admin@example.com").await;

    let resp = app
        .post(
            &format!("/api/admin/users/{other_id}/role"),
            &json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "admin");

    let resp = app
        .post(
            &format!("/api/admin/users/{admin_id}/role"),
            &json!({ "role": "user" }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Kendi rolünüzü değiştiremezsiniz");

    let resp = app
        .post(
            &format!("/api/admin/users/{other_id}/role"),
            &json!({ "role": "owner" }),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let missing = uuid::Uuid::new_v4();
    let resp = app
        .post(
            &format!("/api/admin/users/{missing}/role"),
            &json!({ "role": "user" }),
        )
        .await;
    assert_eq!(resp.status(), 404);

    let users: Value = app.get("/api/admin/users").await.json().await.unwrap();
    assert_eq!(users["users"].as_array().unwrap().len(), 2);
}
