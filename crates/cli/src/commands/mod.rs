//! CLI subcommands.
//!
//! Every command reads `DATABASE_URL` (and `.env`) the same way the server
//! does, so both always talk to the same database.

pub mod backup;
pub mod migrate;
pub mod user;

use duct_order_server::config::{AppConfig, ConfigError};
use duct_order_server::db::backup::BackupError;
use duct_order_server::db::safety::SafetyError;
use duct_order_server::db::{Database, RepositoryError};
use secrecy::ExposeSecret;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Guarded migration refused or failed.
    #[error(transparent)]
    Migration(#[from] SafetyError),

    /// Backup file could not be written or read.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, user")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No user with that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),
}

/// Connect to the configured database.
///
/// # Errors
///
/// Returns `CommandError` if the environment is invalid or the database is
/// unreachable.
pub async fn connect() -> Result<Database, CommandError> {
    let config = AppConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(config.database_url.expose_secret()).await?;
    tracing::info!(backend = %db.backend(), "Connected");
    Ok(db)
}
