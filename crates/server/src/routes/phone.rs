//! Phone number sign-in with SMS one-time codes.
//!
//! The client first asks for a code with `isLogin` set for sign-in or
//! cleared for registration. The code is bound to that purpose, so a code
//! requested for login can't complete a registration.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use duct_order_core::PhoneNumber;

use crate::error::{AppError, Result};
use crate::models::actions;
use crate::routes::auth::{AuthResponse, sign_in};
use crate::routes::{ClientInfo, track_event};
use crate::services::auth::{AuthError, AuthService};
use crate::services::otp::OtpPurpose;
use crate::state::AppState;

/// Code request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_login: bool,
}

/// Code request response.
#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub message: &'static str,
    /// True when the code was logged rather than sent.
    pub demo: bool,
}

/// Phone registration body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneRegisterRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Phone login body.
#[derive(Debug, Deserialize)]
pub struct PhoneLoginRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub otp: String,
}

fn parse_phone(raw: &str) -> Result<PhoneNumber> {
    PhoneNumber::parse(raw).map_err(|e| AppError::Auth(AuthError::from(e)))
}

/// Issue a code and text it to the number.
#[tracing::instrument(skip(state, body))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>> {
    if body.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Telefon numarası gerekli".to_string()));
    }

    let phone = AuthService::new(state.db())
        .check_phone_for(&body.phone, body.is_login)
        .await?;

    let code = state
        .otp()
        .issue(&phone, OtpPurpose::from_is_login(body.is_login))
        .await;
    let receipt = state.sms().send_otp(&phone, &code).await?;

    tracing::info!(phone = %phone.masked(), demo = receipt.demo, "OTP sent");
    Ok(Json(SendOtpResponse {
        message: "Doğrulama kodu gönderildi",
        demo: receipt.demo,
    }))
}

/// Register with a verified code, then sign in.
#[tracing::instrument(skip(state, session, client, body))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(body): Json<PhoneRegisterRequest>,
) -> Result<Json<AuthResponse>> {
    if [&body.phone, &body.otp, &body.first_name, &body.last_name]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(AppError::BadRequest("Tüm alanlar gerekli".to_string()));
    }

    let phone = parse_phone(&body.phone)?;
    state
        .otp()
        .verify(&phone, body.otp.trim(), OtpPurpose::Register)
        .await?;

    let user = AuthService::new(state.db())
        .register_with_phone(phone, &body.first_name, &body.last_name)
        .await?;

    sign_in(&session, &user).await?;
    track_event(
        &state,
        Some(user.id),
        actions::USER_REGISTER,
        json!({ "method": "phone" }),
        &client,
    )
    .await;

    tracing::info!(user_id = %user.id, "User registered with phone");
    Ok(AuthResponse::new("Kayıt başarılı", &user))
}

/// Sign in with a verified code.
#[tracing::instrument(skip(state, session, client, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(body): Json<PhoneLoginRequest>,
) -> Result<Json<AuthResponse>> {
    if body.phone.trim().is_empty() || body.otp.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Telefon numarası ve doğrulama kodu gerekli".to_string(),
        ));
    }

    let phone = parse_phone(&body.phone)?;
    state
        .otp()
        .verify(&phone, body.otp.trim(), OtpPurpose::Login)
        .await?;

    let user = AuthService::new(state.db())
        .login_with_phone(&phone)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => AppError::BadRequest(
                "Bu telefon numarasıyla kayıtlı kullanıcı bulunamadı".to_string(),
            ),
            other => other.into(),
        })?;

    sign_in(&session, &user).await?;
    track_event(
        &state,
        Some(user.id),
        actions::USER_LOGIN,
        json!({ "method": "phone" }),
        &client,
    )
    .await;

    tracing::info!(user_id = %user.id, "User logged in with phone");
    Ok(AuthResponse::new("Giriş başarılı", &user))
}
