//! User backup commands.
//!
//! # Usage
//!
//! ```bash
//! # Write every user to a JSON file
//! duct-cli backup export -o users-backup.json
//!
//! # Load users from a backup (or a legacy users.json), skipping duplicates
//! duct-cli backup import -i users-backup.json
//! ```

use std::path::Path;

use duct_order_server::db::backup;

use super::{CommandError, connect};

/// Export all users to `output`.
///
/// # Errors
///
/// Returns `CommandError` if the database can't be read or the file can't
/// be written.
pub async fn export(output: &Path) -> Result<(), CommandError> {
    let db = connect().await?;
    let count = backup::export_users(&db, output).await?;
    tracing::info!("Exported {} user(s) to {}", count, output.display());
    db.close().await;
    Ok(())
}

/// Import users from `input`.
///
/// # Errors
///
/// Returns `CommandError` if the file is unreadable or invalid, or an insert
/// fails.
pub async fn import(input: &Path) -> Result<(), CommandError> {
    let db = connect().await?;
    let report = backup::import_users(&db, input).await?;
    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        invalid = report.invalid,
        "Imported users from {}",
        input.display()
    );
    if report.invalid > 0 {
        tracing::warn!(
            "{} record(s) had neither a valid email nor a valid phone and were not imported",
            report.invalid
        );
    }
    db.close().await;
    Ok(())
}
