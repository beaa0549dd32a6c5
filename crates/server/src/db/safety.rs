//! Deploy-safe migrations.
//!
//! A deploy must never lose accounts. [`migrate_safely`] counts users,
//! writes a backup when there are any, applies migrations, and then refuses
//! to report success if the count went down.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::backup::{self, BackupError};
use super::{Backend, Database, RepositoryError, UserRepository};

/// Errors from a guarded migration.
#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("pre-migration backup failed: {0}")]
    Backup(#[from] BackupError),
    #[error("user count dropped from {before} to {after} during migration{}", backup_hint(.backup.as_deref()))]
    UserCountDropped {
        before: i64,
        after: i64,
        backup: Option<PathBuf>,
    },
}

fn backup_hint(backup: Option<&Path>) -> String {
    backup.map_or_else(String::new, |path| {
        format!("; restore with `duct-cli backup import -i {}`", path.display())
    })
}

/// Database state observed before migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preflight {
    pub backend: Backend,
    /// `None` when the `users` table doesn't exist yet.
    pub user_count: Option<i64>,
}

/// What a guarded migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub users_before: i64,
    pub users_after: i64,
    /// Backup written before migrating, if any users existed.
    pub backup_path: Option<PathBuf>,
}

/// Inspect the database before migrating.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the catalog query fails.
pub async fn preflight(db: &Database) -> Result<Preflight, RepositoryError> {
    let sql = match db.backend() {
        Backend::Postgres => {
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = 'users'"
        }
        Backend::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
    };
    let tables = on_pool!(db, pool => {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?
    });

    let user_count = if tables > 0 {
        Some(UserRepository::new(db).count().await?)
    } else {
        None
    };

    Ok(Preflight {
        backend: db.backend(),
        user_count,
    })
}

/// Fail when the user count decreased.
///
/// # Errors
///
/// Returns `SafetyError::UserCountDropped` when `after < before`.
pub fn verify_user_count(
    before: i64,
    after: i64,
    backup: Option<&Path>,
) -> Result<(), SafetyError> {
    if after < before {
        return Err(SafetyError::UserCountDropped {
            before,
            after,
            backup: backup.map(Path::to_path_buf),
        });
    }
    Ok(())
}

/// Back up, migrate, and verify that no users were lost.
///
/// The backup lands in `backup_dir` as `users-backup-<timestamp>.json`.
///
/// # Errors
///
/// Returns `SafetyError` if the backup or migrations fail, or if the user
/// count dropped.
pub async fn migrate_safely(
    db: &Database,
    backup_dir: &Path,
) -> Result<MigrationReport, SafetyError> {
    let before = preflight(db).await?;
    let users_before = before.user_count.unwrap_or(0);
    tracing::info!(backend = %before.backend, users = users_before, "Migration preflight");

    let backup_path = if users_before > 0 {
        let path = backup_dir.join(format!(
            "users-backup-{}.json",
            Utc::now().format("%Y%m%dT%H%M%SZ")
        ));
        backup::export_users(db, &path).await?;
        Some(path)
    } else {
        None
    };

    db.migrate().await?;

    let users_after = UserRepository::new(db).count().await?;
    if let Err(e) = verify_user_count(users_before, users_after, backup_path.as_deref()) {
        tracing::error!(error = %e, "User count dropped during migration");
        return Err(e);
    }

    tracing::info!(users = users_after, "Migrations applied, user count verified");
    Ok(MigrationReport {
        users_before,
        users_after,
        backup_path,
    })
}
