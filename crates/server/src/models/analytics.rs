//! Analytics domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use duct_order_core::UserId;

/// Well-known action names recorded by the server itself.
pub mod actions {
    pub const USER_REGISTER: &str = "user_register";
    pub const USER_LOGIN: &str = "user_login";
    pub const PDF_DOWNLOAD: &str = "pdf_download";
    pub const BUTTON_CLICK: &str = "button_click";
    pub const PAGE_VIEW: &str = "page_view";
}

/// A stored analytics event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: i64,
    /// `None` for guest visitors.
    pub user_id: Option<UserId>,
    pub action: String,
    pub data: Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An event about to be recorded.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: Option<UserId>,
    pub action: String,
    pub data: Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Totals across all recorded events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub total_events: i64,
    pub logins: i64,
    pub pdf_downloads: i64,
    pub button_clicks: i64,
    pub page_views: i64,
}

/// Per-user event aggregates as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEventStats {
    pub user_id: UserId,
    pub total_events: i64,
    pub session_count: i64,
    pub pdf_downloads: i64,
    pub button_clicks: i64,
    pub page_views: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub first_event: DateTime<Utc>,
    pub last_event: DateTime<Utc>,
}

/// One row of the admin dashboard's user table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub id: UserId,
    /// Email, or phone for phone-only users.
    pub contact: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub session_count: i64,
    pub total_events: i64,
    pub pdf_downloads: i64,
    pub button_clicks: i64,
    pub page_views: i64,
    pub last_login: Option<DateTime<Utc>>,
    /// Minutes between the user's first and last event.
    pub active_minutes: i64,
}

/// Everything the admin dashboard shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_users: i64,
    pub total_sessions: i64,
    pub total_events: i64,
    pub activity: ActivitySummary,
    pub recent_events: Vec<AnalyticsEvent>,
    pub user_stats: Vec<UserStats>,
}

/// Activity totals by kind.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub pdf_downloads: i64,
    pub button_clicks: i64,
    pub page_views: i64,
}
