//! Database operations for users, reset tokens, and analytics.
//!
//! The server runs against either `PostgreSQL` or `SQLite`, chosen by the
//! scheme of `DATABASE_URL`. Both backends share the same SQL (positional
//! `$n` parameters, `ON CONFLICT`, `RETURNING`); only the schema DDL differs.
//!
//! ## Tables
//!
//! - `users` - Accounts for all three login methods
//! - `reset_tokens` - Single-use password reset tokens
//! - `analytics` - Tracked user and guest actions
//! - `tower_sessions` / `tower_sessions.session` - Session storage, created by the store
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/server/migrations/{postgres,sqlite}`
//! and run at startup or via:
//! ```bash
//! cargo run -p duct-order-cli -- migrate
//! ```

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};

/// Run one expression against whichever pool backs a [`Database`].
///
/// The body is compiled once per backend, so `sqlx::query*` calls inside it
/// infer the right driver from `$pool`.
macro_rules! on_pool {
    ($db:expr, $pool:ident => $body:expr) => {
        match $db {
            $crate::db::Database::Postgres($pool) => $body,
            $crate::db::Database::Sqlite($pool) => $body,
        }
    };
}
pub(crate) use on_pool;

pub mod analytics;
pub mod backup;
pub mod reset_tokens;
pub mod safety;
pub mod users;

pub use analytics::AnalyticsRepository;
pub use reset_tokens::{ResetToken, ResetTokenRepository};
pub use users::UserRepository;

/// Repository error type.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Which SQL engine a [`Database`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    /// Pick the backend from a connection URL's scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pool for either supported backend.
#[derive(Debug, Clone)]
pub enum Database {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Database {
    /// Connect to the database named by `url`.
    ///
    /// `SQLite` files are created if missing and use WAL journaling.
    /// In-memory `SQLite` URLs get a single long-lived connection so every
    /// query sees the same database.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error::Configuration` for an unsupported scheme, or the
    /// driver error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        match Backend::from_url(url) {
            Some(Backend::Postgres) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .min_connections(2)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect(url)
                    .await?;
                Ok(Self::Postgres(pool))
            }
            Some(Backend::Sqlite) => {
                let in_memory = url.contains(":memory:") || url.contains("mode=memory");
                let mut options = SqliteConnectOptions::from_str(url)?
                    .create_if_missing(true)
                    .foreign_keys(true);
                let pool_options = if in_memory {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    options = options.journal_mode(SqliteJournalMode::Wal);
                    SqlitePoolOptions::new().max_connections(5)
                };
                let pool = pool_options
                    .acquire_timeout(Duration::from_secs(10))
                    .connect_with(options)
                    .await?;
                Ok(Self::Sqlite(pool))
            }
            None => Err(sqlx::Error::Configuration(
                "DATABASE_URL must start with postgres://, postgresql:// or sqlite:".into(),
            )),
        }
    }

    /// Which engine this pool talks to.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self {
            Self::Postgres(_) => Backend::Postgres,
            Self::Sqlite(_) => Backend::Sqlite,
        }
    }

    /// Round-trip a trivial query.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        on_pool!(self, pool => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()))
    }

    /// Apply the embedded migrations for this backend.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError` if a migration fails or the recorded history
    /// does not match the embedded files.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        match self {
            Self::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(pool).await,
            Self::Sqlite(pool) => sqlx::migrate!("./migrations/sqlite").run(pool).await,
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        on_pool!(self, pool => pool.close().await);
    }
}

/// Map a unique-constraint violation to `Conflict`, naming the column.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let detail = db_err
            .constraint()
            .map_or_else(|| db_err.message().to_string(), ToString::to_string);
        let field = ["email", "phone", "google_id", "token"]
            .into_iter()
            .find(|field| detail.contains(field))
            .unwrap_or("unique field");
        return RepositoryError::Conflict(format!("{field} already exists"));
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Fresh, migrated in-memory database.
    pub(crate) async fn memory_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[test]
    fn test_backend_from_url() {
        assert_eq!(
            Backend::from_url("postgres://u:p@localhost/duct"),
            Some(Backend::Postgres)
        );
        assert_eq!(
            Backend::from_url("postgresql://localhost/duct"),
            Some(Backend::Postgres)
        );
        assert_eq!(
            Backend::from_url("sqlite://duct_order.db?mode=rwc"),
            Some(Backend::Sqlite)
        );
        assert_eq!(Backend::from_url("sqlite::memory:"), Some(Backend::Sqlite));
        assert_eq!(Backend::from_url("mysql://localhost/duct"), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let result = Database::connect("mysql://localhost/duct").await;
        assert!(matches!(result, Err(sqlx::Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_memory_database_ping_and_migrate_twice() {
        let db = memory_db().await;
        assert_eq!(db.backend(), Backend::Sqlite);
        db.ping().await.unwrap();
        // Already-applied migrations are a no-op
        db.migrate().await.unwrap();
    }
}
