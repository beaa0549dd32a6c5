//! Google OAuth route handlers.
//!
//! Handles the sign-in flow for Google accounts:
//! - Start: stores a CSRF state in the session and redirects to Google
//! - Callback: checks the state, exchanges the code, signs the user in and
//!   sends the browser back to the SPA
//! - Success: the SPA's follow-up call to fetch the signed-in user

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{actions, keys};
use crate::routes::auth::{AuthResponse, sign_in};
use crate::routes::{ClientInfo, track_event};
use crate::services::auth::{AuthError, AuthService};
use crate::services::random_token;
use crate::state::AppState;

/// Length of the CSRF state parameter.
const OAUTH_STATE_LENGTH: usize = 32;

/// Query parameters from Google's redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for an access token.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if the user declined or Google failed.
    pub error: Option<String>,
}

/// `/api/auth/google/status` response body.
#[derive(Debug, Serialize)]
pub struct GoogleStatus {
    pub configured: bool,
    pub message: &'static str,
}

/// Send the browser back to the SPA with an error code.
fn client_error(state: &AppState, code: &str) -> Response {
    Redirect::to(&format!("{}/?error={code}", state.config().client_url)).into_response()
}

/// Whether Google sign-in is available.
pub async fn status(State(state): State<AppState>) -> Json<GoogleStatus> {
    let configured = state.google().is_some();
    Json(GoogleStatus {
        configured,
        message: if configured {
            "Google OAuth is configured"
        } else {
            "Google OAuth is not configured"
        },
    })
}

/// Redirect to Google's consent page.
///
/// # Route
///
/// `GET /api/auth/google`
pub async fn start(State(state): State<AppState>, session: Session) -> Response {
    let Some(google) = state.google() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Google OAuth not configured" })),
        )
            .into_response();
    };

    let oauth_state = random_token(OAUTH_STATE_LENGTH);
    if let Err(e) = session.insert(keys::GOOGLE_OAUTH_STATE, &oauth_state).await {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return client_error(&state, "google_auth_failed");
    }

    let redirect_uri = state.config().google_redirect_uri();
    Redirect::to(&google.authorization_url(&redirect_uri, &oauth_state)).into_response()
}

/// Handle Google's redirect back to the server.
///
/// # Route
///
/// `GET /api/auth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return client_error(&state, "google_auth_failed");
    };

    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Google OAuth error");
        return client_error(&state, "google_auth_failed");
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return client_error(&state, "google_auth_failed");
    };

    // Verify state parameter (CSRF protection)
    let stored_state: Option<String> = session
        .remove(keys::GOOGLE_OAUTH_STATE)
        .await
        .ok()
        .flatten();
    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("Google OAuth state mismatch");
        return client_error(&state, "google_auth_failed");
    }

    let redirect_uri = state.config().google_redirect_uri();
    let profile = match google.exchange_code(&code, &redirect_uri).await {
        Ok(access_token) => match google.fetch_profile(&access_token).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch Google profile");
                return client_error(&state, "google_auth_failed");
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange Google OAuth code");
            return client_error(&state, "google_auth_failed");
        }
    };

    let (user, created) = match AuthService::new(state.db())
        .login_with_google(&profile)
        .await
    {
        Ok(found) => found,
        Err(AuthError::MissingGoogleEmail) => {
            tracing::warn!("Google profile has no usable email");
            return client_error(&state, "no_user");
        }
        Err(e) => {
            tracing::error!(error = %e, "Google sign-in failed");
            return client_error(&state, "google_auth_failed");
        }
    };

    if let Err(e) = sign_in(&session, &user).await {
        tracing::error!(error = %e, "Failed to store Google user in session");
        return client_error(&state, "google_auth_failed");
    }

    let action = if created {
        actions::USER_REGISTER
    } else {
        actions::USER_LOGIN
    };
    track_event(
        &state,
        Some(user.id),
        action,
        json!({ "method": "google" }),
        &client,
    )
    .await;

    tracing::info!(user_id = %user.id, created, "User signed in with Google");
    Redirect::to(&format!("{}/?google_auth=success", state.config().client_url)).into_response()
}

/// The user the OAuth flow just signed in.
///
/// # Route
///
/// `GET /api/auth/google/success`
pub async fn success(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.db()).get_user(current.id).await?;
    Ok(AuthResponse::new("Google ile giriş başarılı", &user))
}
