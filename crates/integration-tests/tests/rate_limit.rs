//! Per-route rate limits.

use duct_order_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_sms_limit_kicks_in_after_burst() {
    let app = TestApp::spawn_with(&[("RATE_LIMIT_ENABLED", "true")]).await;

    for _ in 0..5 {
        let resp = app.post("/api/phone/send-otp", &json!({})).await;
        assert_eq!(resp.status(), 400);
    }

    let resp = app.post("/api/phone/send-otp", &json!({})).await;
    assert_eq!(resp.status(), 429);

    // Other route groups keep their own budget.
    let resp = app.get("/api/status").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_limits_off_when_disabled() {
    let app = TestApp::spawn().await;

    for _ in 0..8 {
        let resp = app.post("/api/phone/send-otp", &json!({})).await;
        assert_eq!(resp.status(), 400);
    }
}
