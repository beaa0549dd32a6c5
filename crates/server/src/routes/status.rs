//! Health checks, API status and the `/api` fallback.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Version reported by `/api/status`.
const API_VERSION: &str = "2.0.0";

/// Endpoints listed by `/api/status`.
const ENDPOINTS: &[&str] = &[
    "POST /api/register",
    "POST /api/login",
    "POST /api/logout",
    "GET /api/me",
    "POST /api/phone/send-otp",
    "POST /api/phone/register",
    "POST /api/phone/login",
    "POST /api/forgot-password",
    "POST /api/reset-password",
    "GET /api/auth/google",
    "GET /api/auth/google/status",
    "GET /api/parts",
    "POST /api/orders/validate",
    "POST /api/orders/document",
    "POST /api/track",
    "GET /api/admin/analytics",
    "GET /api/admin/users",
];

/// `/api/status` response body.
#[derive(Debug, Serialize)]
pub struct ApiStatus {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.db().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Describe the API.
pub async fn api_status() -> Json<ApiStatus> {
    Json(ApiStatus {
        message: "Rectangular Duct Order API",
        version: API_VERSION,
        endpoints: ENDPOINTS,
    })
}

/// Fallback for unknown `/api` paths, so they never reach the SPA.
pub async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API endpoint not found" })),
    )
}
