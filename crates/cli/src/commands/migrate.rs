//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! # Back up users to ./backups, migrate, verify the user count
//! duct-cli migrate
//!
//! # Keep the pre-migration backup somewhere else
//! duct-cli migrate --backup-dir /var/backups/duct
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `sqlite:` or `postgres://` connection string
//!
//! Migrations for both backends are embedded in the server crate under
//! `crates/server/migrations/{sqlite,postgres}/`.

use std::path::Path;

use duct_order_server::db::safety;

use super::{CommandError, connect};

/// Run migrations through the safety wrapper.
///
/// # Errors
///
/// Returns `CommandError` if connecting, backing up or migrating fails, or if
/// users went missing.
pub async fn run(backup_dir: &Path) -> Result<(), CommandError> {
    let db = connect().await?;

    tracing::info!("Running migrations...");
    let report = safety::migrate_safely(&db, backup_dir).await?;

    if let Some(path) = &report.backup_path {
        tracing::info!(path = %path.display(), "Pre-migration backup written");
    }
    tracing::info!(
        users_before = report.users_before,
        users_after = report.users_after,
        "Migrations complete!"
    );

    db.close().await;
    Ok(())
}
