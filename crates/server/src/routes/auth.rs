//! Email and password authentication handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User, UserResponse, actions};
use crate::routes::{ClientInfo, track_event};
use crate::services::auth::{AuthService, PasswordRegistration};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body returned by every sign-in endpoint.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

impl AuthResponse {
    pub(crate) fn new(message: &'static str, user: &User) -> Json<Self> {
        Json(Self {
            message,
            user: UserResponse::from(user),
        })
    }
}

/// Put `user` into the session and tag Sentry with it.
pub(crate) async fn sign_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, user.email.as_ref().map(|e| e.as_str()));
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Register with email and password, then sign in.
///
/// The welcome email goes out in the background; a failed send is logged
/// and never fails the registration.
#[tracing::instrument(skip(state, session, client, body))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    if [&body.email, &body.password, &body.first_name, &body.last_name]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(AppError::BadRequest("Tüm alanlar gerekli".to_string()));
    }

    let user = AuthService::new(state.db())
        .register_with_password(PasswordRegistration {
            email: &body.email,
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    sign_in(&session, &user).await?;
    track_event(
        &state,
        Some(user.id),
        actions::USER_REGISTER,
        json!({ "method": "email" }),
        &client,
    )
    .await;

    if let Some(email) = user.email.clone() {
        let mailer = state.email().clone();
        let name = user.first_name.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&email, &name).await {
                tracing::warn!(error = %e, "Failed to send welcome email");
            }
        });
    }

    tracing::info!(user_id = %user.id, "User registered with email");
    Ok(AuthResponse::new("Kayıt başarılı", &user))
}

/// Sign in with email and password.
#[tracing::instrument(skip(state, session, client, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("E-posta ve şifre gerekli".to_string()));
    }

    let user = AuthService::new(state.db())
        .login_with_password(&body.email, &body.password)
        .await?;

    sign_in(&session, &user).await?;
    track_event(
        &state,
        Some(user.id),
        actions::USER_LOGIN,
        json!({ "method": "email" }),
        &client,
    )
    .await;

    tracing::info!(user_id = %user.id, "User logged in with email");
    Ok(AuthResponse::new("Giriş başarılı", &user))
}

/// The signed-in user, fresh from the database.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<serde_json::Value>> {
    let user = AuthService::new(state.db()).get_user(current.id).await?;
    Ok(Json(json!({ "user": UserResponse::from(&user) })))
}

/// End the session.
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Başarıyla çıkış yapıldı" })))
}
