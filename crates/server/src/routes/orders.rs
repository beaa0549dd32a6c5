//! Parts catalog and order list handlers.
//!
//! Order lists live in the browser; the server only checks them against
//! the catalog and renders a printable sheet.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use duct_order_core::{Customer, OrderItem, OrderSheet, PartDefinition, catalog, validate_order};

use crate::error::Result;
use crate::middleware::{RequireUser, sanitize_optional};
use crate::models::{CurrentUser, actions};
use crate::routes::{ClientInfo, track_event};
use crate::state::AppState;

/// Offset of the business's local time (Türkiye, UTC+3).
const LOCAL_OFFSET_SECONDS: i32 = 3 * 60 * 60;

/// Body of both order endpoints.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl OrderRequest {
    /// Items with their free-text notes stripped of markup.
    fn into_sanitized_items(self) -> Vec<OrderItem> {
        self.items
            .into_iter()
            .map(|mut item| {
                item.notes = sanitize_optional(item.notes.as_deref());
                item
            })
            .collect()
    }
}

/// Today's date in local business time.
fn local_today() -> NaiveDate {
    FixedOffset::east_opt(LOCAL_OFFSET_SECONDS).map_or_else(
        || Utc::now().date_naive(),
        |offset| Utc::now().with_timezone(&offset).date_naive(),
    )
}

fn customer_of(user: &CurrentUser) -> Customer {
    Customer {
        name: format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string(),
        email: user.email.as_ref().map(ToString::to_string),
        phone: user.phone.as_ref().map(ToString::to_string),
    }
}

/// The parts catalog the order form is built from.
pub async fn parts() -> Json<&'static [PartDefinition]> {
    Json(catalog())
}

/// Check an order list without rendering it.
pub async fn validate(Json(body): Json<OrderRequest>) -> Result<Json<Value>> {
    let items = body.into_sanitized_items();
    validate_order(&items)?;

    let total_quantity: u32 = items.iter().map(|item| item.quantity).sum();
    Ok(Json(json!({
        "valid": true,
        "itemCount": items.len(),
        "totalQuantity": total_quantity,
    })))
}

/// Render the order list as a downloadable text sheet.
#[tracing::instrument(skip(state, current, client, body), fields(user_id = %current.id))]
pub async fn document(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    client: ClientInfo,
    Json(body): Json<OrderRequest>,
) -> Result<Response> {
    let items = body.into_sanitized_items();
    let sheet = OrderSheet::build(&items, customer_of(&current), local_today())?;

    track_event(
        &state,
        Some(current.id),
        actions::PDF_DOWNLOAD,
        json!({
            "itemCount": sheet.items.len(),
            "totalQuantity": sheet.total_quantity(),
        }),
        &client,
    )
    .await;

    let disposition = format!("attachment; filename=\"{}\"", sheet.file_name("txt"));
    tracing::info!(items = sheet.items.len(), "Order sheet generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        sheet.to_text(),
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use duct_order_core::{Email, Role, UserId};

    use super::*;

    #[test]
    fn test_customer_from_session_user() {
        let user = CurrentUser {
            id: UserId::new_v4(),
            email: Some(Email::parse("ali@example.com").unwrap()),
            phone: None,
            first_name: "Ali".to_string(),
            last_name: "Kaya".to_string(),
            role: Role::User,
        };
        let customer = customer_of(&user);
        assert_eq!(customer.name, "Ali Kaya");
        assert_eq!(customer.email.as_deref(), Some("ali@example.com"));
        assert!(customer.phone.is_none());
    }

    #[test]
    fn test_notes_are_sanitized() {
        let body: OrderRequest = serde_json::from_value(json!({
            "items": [{
                "id": "1",
                "partKey": "1-duz-kanal.png",
                "quantity": 2,
                "notes": "<b>acil</b>"
            }]
        }))
        .unwrap();
        let items = body.into_sanitized_items();
        assert_eq!(items[0].notes.as_deref(), Some("acil"));
    }
}
