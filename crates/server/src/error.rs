//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Every error body is
//! `{ "error": "<message>" }` with a Turkish message for the SPA to show.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use duct_order_core::OrderError;

use crate::db::RepositoryError;
use crate::services::analytics::AnalyticsError;
use crate::services::auth::AuthError;
use crate::services::email::EmailError;
use crate::services::otp::OtpError;
use crate::services::sms::SmsError;

/// Generic message for failures the client can't act on.
const SERVER_ERROR: &str = "Sunucu hatası";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// OTP verification failed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Order list rejected.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Tracking input rejected or summary failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    /// SMS delivery failed.
    #[error("SMS error: {0}")]
    Sms(#[from] SmsError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is the server's fault rather than the client's.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_)
            | Self::Sms(_)
            | Self::Email(_)
            | Self::Session(_)
            | Self::Internal(_) => true,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Analytics(err) => matches!(err, AnalyticsError::Repository(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Auth(AuthError::UserNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Sms(_) => "SMS gönderilemedi".to_string(),
            Self::Email(_) => "E-posta gönderilemedi".to_string(),
            Self::Auth(err) => auth_message(err).to_string(),
            Self::Otp(err) => otp_message(err).to_string(),
            Self::Order(err) => order_message(err),
            Self::Analytics(err) => match err {
                AnalyticsError::MissingAction => "Action is required".to_string(),
                AnalyticsError::InvalidAction => "Geçersiz action formatı".to_string(),
                AnalyticsError::InvalidData => "Data objesi olmalıdır".to_string(),
                AnalyticsError::Repository(_) => SERVER_ERROR.to_string(),
            },
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => SERVER_ERROR.to_string(),
        }
    }
}

fn auth_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidEmail(_) => "Geçerli bir e-posta adresi girin",
        AuthError::InvalidPhone(_) => "Geçerli bir Türk telefon numarası girin",
        AuthError::InvalidCredentials => "Geçersiz e-posta veya şifre",
        AuthError::UserNotFound => "Kullanıcı bulunamadı",
        AuthError::UserAlreadyExists => "Bu e-posta adresi zaten kayıtlı",
        AuthError::PhoneAlreadyRegistered => "Bu telefon numarası zaten kayıtlı",
        AuthError::PhoneNotRegistered => "Bu telefon numarası kayıtlı değil",
        AuthError::WeakPassword(msg) | AuthError::InvalidName(msg) => msg,
        AuthError::InvalidResetToken => "Geçersiz veya kullanılmış token",
        AuthError::ExpiredResetToken => "Token süresi dolmuş",
        AuthError::MissingGoogleEmail => "Google hesabında e-posta adresi bulunamadı",
        AuthError::Repository(_) | AuthError::PasswordHash => SERVER_ERROR,
    }
}

fn otp_message(err: &OtpError) -> &'static str {
    match err {
        OtpError::InvalidOrExpired => "Geçersiz veya süresi dolmuş kod",
        OtpError::Expired => "Doğrulama kodu süresi doldu",
        OtpError::InvalidCode => "Geçersiz doğrulama kodu",
    }
}

fn order_message(err: &OrderError) -> String {
    match err {
        OrderError::Empty => "Sipariş listesi boş".to_string(),
        OrderError::TooManyItems { max, .. } => {
            format!("Bir siparişte en fazla {max} kalem olabilir")
        }
        OrderError::UnknownPart { position, key } => {
            format!("{position}. kalem: bilinmeyen parça ({key})")
        }
        OrderError::InvalidQuantity { position, max, .. } => {
            format!("{position}. kalem: adet 1 ile {max} arasında olmalıdır")
        }
        OrderError::UnknownMeasurement { position, key } => {
            format!("{position}. kalem: bilinmeyen ölçü ({key})")
        }
        OrderError::InvalidMeasurement { position, key, max } => {
            format!("{position}. kalem: {key} ölçüsü 0'dan büyük ve en fazla {max} cm olmalıdır")
        }
        OrderError::UnknownCheckbox { position, key } => {
            format!("{position}. kalem: bilinmeyen seçenek ({key})")
        }
        OrderError::UnknownDirection { position, key } => {
            format!("{position}. kalem: bilinmeyen yön ({key})")
        }
        OrderError::TooManyCollars { position, key, max } => {
            format!("{position}. kalem: {key} en fazla {max} adet olabilir")
        }
        OrderError::NotesTooLong { position, max } => {
            format!("{position}. kalem: not en fazla {max} karakter olabilir")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        // Don't expose internal error details to clients
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
