//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (HSTS, frame and sniffing protection)
//! 5. CORS (SPA dev server and configured origins)
//! 6. Session layer (tower-sessions with the SQL store)
//! 7. Rate limiting (governor, per route group)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod sanitize;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalUser, RequireAdmin, RequireUser, clear_current_user, set_current_user,
};
pub use rate_limit::{
    RateLimiterLayer, analytics_rate_limiter, api_rate_limiter, auth_rate_limiter, client_ip,
    password_reset_rate_limiter, sms_rate_limiter,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use sanitize::{sanitize_optional, sanitize_text};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
