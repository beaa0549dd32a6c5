//! JSON export and import of user accounts.
//!
//! The current format is a versioned document:
//!
//! ```json
//! { "version": 1, "exportedAt": "…", "users": [ { "id": "…", "email": "…", … } ] }
//! ```
//!
//! Import also accepts the older bare-array `users.json` layout
//! (`id, email, password, firstName, lastName, googleId, phone, createdAt`).
//! Those records get fresh IDs, and their bcrypt hashes are dropped; the
//! affected users sign in again through password reset.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duct_order_core::{Email, PhoneNumber, Role, UserId};

use super::{Database, RepositoryError, UserRepository};
use crate::models::User;

/// Current backup document version.
pub const BACKUP_VERSION: u32 = 1;

/// Errors from exporting or importing backups.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid backup JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported backup version {0} (expected {BACKUP_VERSION})")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Versioned backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub users: Vec<BackupUser>,
}

/// One user in a backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupUser {
    pub id: UserId,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub google_id: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for BackupUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            google_id: user.google_id.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<BackupUser> for User {
    fn from(user: BackupUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            google_id: user.google_id,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A record from the legacy `users.json` file. Every field is loose text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyUser {
    email: Option<String>,
    password: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    google_id: Option<String>,
    phone: Option<String>,
    created_at: Option<String>,
}

impl LegacyUser {
    /// Convert to a user, or `None` if neither email nor phone is usable.
    fn into_user(self, now: DateTime<Utc>) -> Option<User> {
        let email = self.email.as_deref().and_then(|e| Email::parse(e).ok());
        let phone = self.phone.as_deref().and_then(|p| PhoneNumber::parse(p).ok());
        if email.is_none() && phone.is_none() {
            return None;
        }
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map_or(now, |t| t.with_timezone(&Utc));
        // Only Argon2 hashes verify on this stack
        let password_hash = self.password.filter(|h| h.starts_with("$argon2"));

        Some(User {
            id: UserId::new_v4(),
            email,
            phone,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            google_id: self.google_id.filter(|g| !g.is_empty()),
            role: Role::User,
            created_at,
            updated_at: now,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BackupFile {
    Current(BackupDocument),
    Legacy(Vec<LegacyUser>),
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Users written to the database.
    pub imported: usize,
    /// Users whose ID, email, phone or Google ID already existed.
    pub skipped: usize,
    /// Legacy records with neither a valid email nor a valid phone.
    pub invalid: usize,
}

/// Write every user to `path` as a versioned backup document.
///
/// Returns the number of users written.
///
/// # Errors
///
/// Returns `BackupError` if reading users or writing the file fails.
pub async fn export_users(db: &Database, path: &Path) -> Result<usize, BackupError> {
    let users = UserRepository::new(db).list_all().await?;
    let document = BackupDocument {
        version: BACKUP_VERSION,
        exported_at: Utc::now(),
        users: users.iter().map(BackupUser::from).collect(),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(&document)?;
    tokio::fs::write(path, json).await?;

    tracing::info!(path = %path.display(), users = users.len(), "Exported user backup");
    Ok(users.len())
}

/// Load users from a backup file, skipping any that already exist.
///
/// # Errors
///
/// Returns `BackupError` if the file can't be read or parsed, has an
/// unsupported version, or an insert fails.
pub async fn import_users(db: &Database, path: &Path) -> Result<ImportReport, BackupError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let now = Utc::now();

    let (users, invalid) = match serde_json::from_str::<BackupFile>(&raw)? {
        BackupFile::Current(document) => {
            if document.version != BACKUP_VERSION {
                return Err(BackupError::UnsupportedVersion(document.version));
            }
            (document.users.into_iter().map(User::from).collect(), 0)
        }
        BackupFile::Legacy(records) => {
            let total = records.len();
            let users: Vec<User> = records
                .into_iter()
                .filter_map(|record| record.into_user(now))
                .collect();
            let invalid = total - users.len();
            (users, invalid)
        }
    };

    let repo = UserRepository::new(db);
    let mut report = ImportReport {
        invalid,
        ..ImportReport::default()
    };
    for user in &users {
        if repo.insert_if_absent(user).await? {
            report.imported += 1;
        } else {
            tracing::debug!(user_id = %user.id, "Skipping existing user");
            report.skipped += 1;
        }
    }

    tracing::info!(
        path = %path.display(),
        imported = report.imported,
        skipped = report.skipped,
        invalid = report.invalid,
        "Imported user backup"
    );
    Ok(report)
}
