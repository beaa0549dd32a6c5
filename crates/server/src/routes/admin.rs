//! Admin dashboard handlers.
//!
//! Every handler takes [`RequireAdmin`], which re-reads the caller's role
//! from the database.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use duct_order_core::{Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{AnalyticsSummary, UserResponse};
use crate::services::analytics::AnalyticsService;
use crate::state::AppState;

/// Role change request body.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Role change response.
#[derive(Debug, Serialize)]
pub struct SetRoleResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

/// Users list response.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

/// Dashboard totals, recent events and per-user activity.
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AnalyticsSummary>> {
    let summary = AnalyticsService::new(state.db()).summary().await?;
    Ok(Json(summary))
}

/// Every registered user, newest first.
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<UsersResponse>> {
    let users = UserRepository::new(state.db()).list_all().await?;
    Ok(Json(UsersResponse {
        users: users.iter().map(UserResponse::from).collect(),
    }))
}

/// Promote or demote a user. Admins can't change their own role.
#[tracing::instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<SetRoleResponse>> {
    let id = UserId::parse(&id)
        .map_err(|_| AppError::BadRequest("Geçersiz kullanıcı kimliği".to_string()))?;
    let role: Role = body
        .role
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Geçersiz rol".to_string()))?;

    if id == admin.id {
        return Err(AppError::BadRequest(
            "Kendi rolünüzü değiştiremezsiniz".to_string(),
        ));
    }

    let user = UserRepository::new(state.db())
        .set_role(id, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Kullanıcı bulunamadı".to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, role = %role, "User role changed");
    Ok(Json(SetRoleResponse {
        message: "Rol güncellendi",
        user: UserResponse::from(&user),
    }))
}
