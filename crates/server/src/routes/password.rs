//! Password reset handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Same answer for known and unknown addresses.
const RESET_REQUESTED: &str =
    "Eğer bu e-posta adresi kayıtlıysa, şifre sıfırlama bağlantısı gönderildi";

/// Forgot password body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Reset password body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

/// Email a reset link if the address belongs to a user.
///
/// A failed send is logged but answered like a successful one, so the
/// response never tells whether the address is registered.
#[tracing::instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    if body.email.trim().is_empty() {
        return Err(AppError::BadRequest("E-posta adresi gerekli".to_string()));
    }

    let issued = AuthService::new(state.db())
        .request_password_reset(&body.email)
        .await?;

    if let Some((user, token)) = issued
        && let Some(email) = user.email.as_ref()
    {
        match state
            .email()
            .send_password_reset(email, &user.first_name, &token)
            .await
        {
            Ok(()) => tracing::info!(user_id = %user.id, "Password reset email sent"),
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    user_id = %user.id,
                    sentry_event_id = %event_id,
                    "Failed to send password reset email"
                );
            }
        }
    }

    Ok(Json(json!({ "message": RESET_REQUESTED })))
}

/// Set a new password with a reset token.
#[tracing::instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    if body.token.trim().is_empty() || body.new_password.is_empty() {
        return Err(AppError::BadRequest("Token ve yeni şifre gerekli".to_string()));
    }

    let user = AuthService::new(state.db())
        .reset_password(body.token.trim(), &body.new_password)
        .await?;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(Json(json!({ "message": "Şifreniz başarıyla güncellendi" })))
}
