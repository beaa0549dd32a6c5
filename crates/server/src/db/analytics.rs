//! Analytics event storage and aggregation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;

use duct_order_core::UserId;

use super::{Database, RepositoryError};
use crate::models::{ActivityCounts, AnalyticsEvent, NewEvent, UserEventStats};

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    user_id: Option<String>,
    action: String,
    data: Json<Value>,
    ip: Option<String>,
    user_agent: Option<String>,
    created_at: i64,
}

impl TryFrom<EventRow> for AnalyticsEvent {
    type Error = RepositoryError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: parse_user_id(row.user_id.as_deref())?,
            action: row.action,
            data: row.data.0,
            ip: row.ip,
            user_agent: row.user_agent,
            created_at: from_millis(row.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    total_events: i64,
    logins: i64,
    pdf_downloads: i64,
    button_clicks: i64,
    page_views: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct UserStatsRow {
    user_id: String,
    total_events: i64,
    session_count: i64,
    pdf_downloads: i64,
    button_clicks: i64,
    page_views: i64,
    last_login: Option<i64>,
    first_event: i64,
    last_event: i64,
}

impl TryFrom<UserStatsRow> for UserEventStats {
    type Error = RepositoryError;

    fn try_from(row: UserStatsRow) -> Result<Self, Self::Error> {
        let user_id = parse_user_id(Some(&row.user_id))?.ok_or_else(|| {
            RepositoryError::DataCorruption("missing user id in analytics".to_string())
        })?;
        Ok(Self {
            user_id,
            total_events: row.total_events,
            session_count: row.session_count,
            pdf_downloads: row.pdf_downloads,
            button_clicks: row.button_clicks,
            page_views: row.page_views,
            last_login: row.last_login.map(from_millis).transpose()?,
            first_event: from_millis(row.first_event)?,
            last_event: from_millis(row.last_event)?,
        })
    }
}

fn parse_user_id(raw: Option<&str>) -> Result<Option<UserId>, RepositoryError> {
    raw.map(UserId::parse).transpose().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid user id in analytics: {e}"))
    })
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("invalid timestamp in analytics: {millis}"))
    })
}

/// Repository for analytics events.
pub struct AnalyticsRepository<'a> {
    db: &'a Database,
}

impl<'a> AnalyticsRepository<'a> {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store an event stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, event: &NewEvent, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        on_pool!(self.db, pool => {
            sqlx::query(
                "INSERT INTO analytics (user_id, action, data, ip, user_agent, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(event.user_id.map(|id| id.to_string()))
            .bind(&event.action)
            .bind(Json(&event.data))
            .bind(event.ip.as_deref())
            .bind(event.user_agent.as_deref())
            .bind(at.timestamp_millis())
            .execute(pool)
            .await?;
        });
        Ok(())
    }

    /// Totals over every stored event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary_counts(&self) -> Result<ActivityCounts, RepositoryError> {
        let row = on_pool!(self.db, pool => {
            sqlx::query_as::<_, CountsRow>(
                "SELECT COUNT(*) AS total_events, \
                 COALESCE(SUM(CASE WHEN action = 'user_login' THEN 1 ELSE 0 END), 0) AS logins, \
                 COALESCE(SUM(CASE WHEN action = 'pdf_download' THEN 1 ELSE 0 END), 0) AS pdf_downloads, \
                 COALESCE(SUM(CASE WHEN action = 'button_click' THEN 1 ELSE 0 END), 0) AS button_clicks, \
                 COALESCE(SUM(CASE WHEN action = 'page_view' THEN 1 ELSE 0 END), 0) AS page_views \
                 FROM analytics",
            )
            .fetch_one(pool)
            .await?
        });

        Ok(ActivityCounts {
            total_events: row.total_events,
            logins: row.logins,
            pdf_downloads: row.pdf_downloads,
            button_clicks: row.button_clicks,
            page_views: row.page_views,
        })
    }

    /// The latest `limit` events, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AnalyticsEvent>, RepositoryError> {
        let rows = on_pool!(self.db, pool => {
            sqlx::query_as::<_, EventRow>(
                "SELECT id, user_id, action, data, ip, user_agent, created_at \
                 FROM analytics ORDER BY created_at DESC, id DESC LIMIT $1",
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        });
        rows.into_iter().map(AnalyticsEvent::try_from).collect()
    }

    /// Aggregates for every user with at least one event.
    ///
    /// Registration counts as a session alongside logins, since it signs the
    /// user in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn per_user_stats(&self) -> Result<Vec<UserEventStats>, RepositoryError> {
        let rows = on_pool!(self.db, pool => {
            sqlx::query_as::<_, UserStatsRow>(
                "SELECT user_id, COUNT(*) AS total_events, \
                 COALESCE(SUM(CASE WHEN action IN ('user_login', 'user_register') THEN 1 ELSE 0 END), 0) AS session_count, \
                 COALESCE(SUM(CASE WHEN action = 'pdf_download' THEN 1 ELSE 0 END), 0) AS pdf_downloads, \
                 COALESCE(SUM(CASE WHEN action = 'button_click' THEN 1 ELSE 0 END), 0) AS button_clicks, \
                 COALESCE(SUM(CASE WHEN action = 'page_view' THEN 1 ELSE 0 END), 0) AS page_views, \
                 MAX(CASE WHEN action IN ('user_login', 'user_register') THEN created_at END) AS last_login, \
                 MIN(created_at) AS first_event, \
                 MAX(created_at) AS last_event \
                 FROM analytics WHERE user_id IS NOT NULL GROUP BY user_id",
            )
            .fetch_all(pool)
            .await?
        });
        rows.into_iter().map(UserEventStats::try_from).collect()
    }
}
