//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database ping)
//! GET  /api/status                  - API name, version and endpoint list
//!
//! # Email auth (auth limiter)
//! POST /api/register                - Register with email and password
//! POST /api/login                   - Login with email and password
//! GET  /api/me                      - Current user
//! POST /api/logout                  - End the session
//!
//! # Phone auth
//! POST /api/phone/send-otp          - Send a code by SMS (sms limiter)
//! POST /api/phone/register          - Register with a verified code (auth limiter)
//! POST /api/phone/login             - Login with a verified code (auth limiter)
//!
//! # Password reset (password reset limiter)
//! POST /api/forgot-password         - Email a reset link
//! POST /api/reset-password          - Set a new password with a token
//!
//! # Google OAuth
//! GET  /api/auth/google/status      - Whether Google sign-in is configured
//! GET  /api/auth/google             - Redirect to Google
//! GET  /api/auth/google/callback    - Handle Google's redirect
//! GET  /api/auth/google/success     - Current user after OAuth
//!
//! # Orders
//! GET  /api/parts                   - Parts catalog
//! POST /api/orders/validate         - Validate an order list
//! POST /api/orders/document         - Download the order sheet (auth required)
//!
//! # Analytics (analytics limiter)
//! POST /api/track                   - Record a client event
//!
//! # Admin (admin role required)
//! GET  /api/admin/analytics         - Dashboard summary
//! GET  /api/admin/users             - All users
//! POST /api/admin/users/{id}/role   - Change a user's role
//! ```
//!
//! Everything else under `/api` answers 404 JSON; other paths serve the SPA.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod google;
pub mod orders;
pub mod password;
pub mod phone;
pub mod status;

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts},
    routing::{any, get, post},
};
use serde_json::Value;

use duct_order_core::UserId;

use crate::middleware::{
    RateLimiterLayer, analytics_rate_limiter, api_rate_limiter, auth_rate_limiter, client_ip,
    password_reset_rate_limiter, sms_rate_limiter,
};
use crate::models::NewEvent;
use crate::services::analytics::AnalyticsService;
use crate::state::AppState;

/// Longest user agent stored with an analytics event.
const MAX_USER_AGENT_LENGTH: usize = 512;

/// Request metadata stored with analytics events.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LENGTH).collect());

        Ok(Self {
            ip: client_ip(&parts.headers, peer).map(|ip| ip.to_string()),
            user_agent,
        })
    }
}

/// Record an analytics event without failing the request.
pub(crate) async fn track_event(
    state: &AppState,
    user_id: Option<UserId>,
    action: &str,
    data: Value,
    client: &ClientInfo,
) {
    AnalyticsService::new(state.db())
        .track(NewEvent {
            user_id,
            action: action.to_string(),
            data,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        })
        .await;
}

fn limited(
    router: Router<AppState>,
    enabled: bool,
    limiter: fn() -> RateLimiterLayer,
) -> Router<AppState> {
    if enabled {
        router.layer(limiter())
    } else {
        router
    }
}

/// Email and phone sign-in routes.
fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/phone/register", post(phone::register))
        .route("/phone/login", post(phone::login));
    limited(router, rate_limited, auth_rate_limiter)
}

/// OTP send route.
fn sms_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new().route("/phone/send-otp", post(phone::send_otp));
    limited(router, rate_limited, sms_rate_limiter)
}

/// Forgot/reset password routes.
fn password_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/forgot-password", post(password::forgot_password))
        .route("/reset-password", post(password::reset_password));
    limited(router, rate_limited, password_reset_rate_limiter)
}

/// Event tracking route.
fn analytics_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new().route("/track", post(analytics::track));
    limited(router, rate_limited, analytics_rate_limiter)
}

/// Everything else under `/api`.
fn general_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/status", get(status::api_status))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/auth/google/status", get(google::status))
        .route("/auth/google", get(google::start))
        .route("/auth/google/callback", get(google::callback))
        .route("/auth/google/success", get(google::success))
        .route("/parts", get(orders::parts))
        .route("/orders/validate", post(orders::validate))
        .route("/orders/document", post(orders::document))
        .route("/admin/analytics", get(admin::analytics))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/{id}/role", post(admin::set_role));
    limited(router, rate_limited, api_rate_limiter)
}

/// All `/api` routes, with per-group rate limits when enabled.
pub fn api_routes(rate_limited: bool) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(rate_limited))
        .merge(sms_routes(rate_limited))
        .merge(password_routes(rate_limited))
        .merge(analytics_routes(rate_limited))
        .merge(general_routes(rate_limited))
        .fallback(any(status::api_not_found))
}

/// Health check routes, outside `/api` and never rate limited.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(status::health))
        .route("/health/ready", get(status::readiness))
}
