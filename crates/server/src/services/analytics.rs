//! Event tracking and the admin dashboard summary.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::db::{AnalyticsRepository, Database, RepositoryError, UserRepository};
use crate::models::{ActivitySummary, AnalyticsSummary, NewEvent, UserStats};

/// Events shown in the dashboard's recent activity list.
pub const RECENT_EVENT_LIMIT: i64 = 20;

/// Longest accepted action name.
const MAX_ACTION_LENGTH: usize = 100;

static ACTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("action pattern is valid"));

/// Errors from tracking input or the summary query.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("action is required")]
    MissingAction,
    #[error("invalid action name")]
    InvalidAction,
    #[error("event data must be a JSON object")]
    InvalidData,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Check a client-supplied action name.
///
/// # Errors
///
/// Returns `AnalyticsError::MissingAction` for an empty name and
/// `AnalyticsError::InvalidAction` for anything outside `[A-Za-z0-9_-]{1,100}`.
pub fn validate_action(action: &str) -> Result<&str, AnalyticsError> {
    let action = action.trim();
    if action.is_empty() {
        return Err(AnalyticsError::MissingAction);
    }
    if action.len() > MAX_ACTION_LENGTH || !ACTION_PATTERN.is_match(action) {
        return Err(AnalyticsError::InvalidAction);
    }
    Ok(action)
}

/// Normalize client-supplied event data. Missing data becomes `{}`.
///
/// # Errors
///
/// Returns `AnalyticsError::InvalidData` if the value isn't an object.
pub fn validate_data(data: Option<Value>) -> Result<Value, AnalyticsError> {
    match data {
        None | Some(Value::Null) => Ok(Value::Object(serde_json::Map::new())),
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(AnalyticsError::InvalidData),
    }
}

/// Analytics service.
pub struct AnalyticsService<'a> {
    events: AnalyticsRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> AnalyticsService<'a> {
    /// Create a new analytics service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            events: AnalyticsRepository::new(db),
            users: UserRepository::new(db),
        }
    }

    /// Record an event. Storage failures are logged and swallowed so that
    /// tracking never breaks the request that triggered it.
    pub async fn track(&self, event: NewEvent) {
        if let Err(e) = self.events.record(&event, Utc::now()).await {
            tracing::warn!(error = %e, action = %event.action, "Failed to record analytics event");
        }
    }

    /// Build the admin dashboard summary.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Repository` if any query fails.
    pub async fn summary(&self) -> Result<AnalyticsSummary, AnalyticsError> {
        let counts = self.events.summary_counts().await?;
        let recent_events = self.events.recent(RECENT_EVENT_LIMIT).await?;
        let users = self.users.list_all().await?;
        let mut per_user: HashMap<_, _> = self
            .events
            .per_user_stats()
            .await?
            .into_iter()
            .map(|stats| (stats.user_id, stats))
            .collect();

        let mut user_stats: Vec<UserStats> = users
            .iter()
            .map(|user| {
                let stats = per_user.remove(&user.id);
                let mut row = UserStats {
                    id: user.id,
                    contact: user.contact(),
                    name: user.full_name(),
                    created_at: user.created_at,
                    session_count: 0,
                    total_events: 0,
                    pdf_downloads: 0,
                    button_clicks: 0,
                    page_views: 0,
                    last_login: None,
                    active_minutes: 0,
                };
                if let Some(stats) = stats {
                    row.session_count = stats.session_count;
                    row.total_events = stats.total_events;
                    row.pdf_downloads = stats.pdf_downloads;
                    row.button_clicks = stats.button_clicks;
                    row.page_views = stats.page_views;
                    row.last_login = stats.last_login;
                    if stats.total_events > 1 {
                        row.active_minutes = (stats.last_event - stats.first_event).num_minutes();
                    }
                }
                row
            })
            .collect();

        // Most recent login first; users who never logged in go last
        user_stats.sort_by(|a, b| b.last_login.cmp(&a.last_login));

        Ok(AnalyticsSummary {
            total_users: i64::try_from(users.len()).unwrap_or(i64::MAX),
            total_sessions: counts.logins,
            total_events: counts.total_events,
            activity: ActivitySummary {
                pdf_downloads: counts.pdf_downloads,
                button_clicks: counts.button_clicks,
                page_views: counts.page_views,
            },
            recent_events,
            user_stats,
        })
    }
}
