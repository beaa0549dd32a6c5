//! Client event tracking.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::OptionalUser;
use crate::routes::{ClientInfo, track_event};
use crate::services::analytics::{validate_action, validate_data};
use crate::state::AppState;

/// Tracking request body.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub action: String,
    pub data: Option<Value>,
}

/// Record an event for the signed-in user, or a guest.
pub async fn track(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    client: ClientInfo,
    Json(body): Json<TrackRequest>,
) -> Result<Json<Value>> {
    let action = validate_action(&body.action)?;
    let data = validate_data(body.data)?;

    track_event(&state, user.map(|u| u.id), action, data, &client).await;
    Ok(Json(json!({ "message": "Tracking successful" })))
}
