//! Password reset token storage.
//!
//! Times are stored as Unix epoch milliseconds so expiry comparisons behave
//! the same on both backends.

use chrono::{DateTime, Utc};

use duct_order_core::{Email, UserId};

use super::{Database, RepositoryError};

/// A stored password reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub user_id: UserId,
    /// Address the reset link was sent to.
    pub email: Email,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResetTokenRow {
    token: String,
    user_id: String,
    email: String,
    expires_at: i64,
    created_at: i64,
}

impl TryFrom<ResetTokenRow> for ResetToken {
    type Error = RepositoryError;

    fn try_from(row: ResetTokenRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str| RepositoryError::DataCorruption(format!("invalid {what} in reset token"));
        Ok(Self {
            user_id: UserId::parse(&row.user_id).map_err(|_| corrupt("user id"))?,
            email: Email::parse(&row.email).map_err(|_| corrupt("email"))?,
            expires_at: DateTime::from_timestamp_millis(row.expires_at)
                .ok_or_else(|| corrupt("expiry"))?,
            created_at: DateTime::from_timestamp_millis(row.created_at)
                .ok_or_else(|| corrupt("creation time"))?,
            token: row.token,
        })
    }
}

/// Repository for password reset tokens.
pub struct ResetTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> ResetTokenRepository<'a> {
    /// Create a new reset token repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a token, replacing any row with the same token value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, token: &ResetToken) -> Result<(), RepositoryError> {
        on_pool!(self.db, pool => {
            sqlx::query(
                "INSERT INTO reset_tokens (token, user_id, email, expires_at, created_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (token) DO UPDATE SET user_id = excluded.user_id, \
                 email = excluded.email, expires_at = excluded.expires_at, \
                 created_at = excluded.created_at",
            )
            .bind(&token.token)
            .bind(token.user_id.to_string())
            .bind(token.email.as_str())
            .bind(token.expires_at.timestamp_millis())
            .bind(token.created_at.timestamp_millis())
            .execute(pool)
            .await?;
        });
        Ok(())
    }

    /// Look up a token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, token: &str) -> Result<Option<ResetToken>, RepositoryError> {
        let row = on_pool!(self.db, pool => {
            sqlx::query_as::<_, ResetTokenRow>(
                "SELECT token, user_id, email, expires_at, created_at \
                 FROM reset_tokens WHERE token = $1",
            )
            .bind(token)
            .fetch_optional(pool)
            .await?
        });
        row.map(ResetToken::try_from).transpose()
    }

    /// Delete a token and return it. Of two concurrent callers, only one
    /// receives the row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn consume(&self, token: &str) -> Result<Option<ResetToken>, RepositoryError> {
        let row = on_pool!(self.db, pool => {
            sqlx::query_as::<_, ResetTokenRow>(
                "DELETE FROM reset_tokens WHERE token = $1 \
                 RETURNING token, user_id, email, expires_at, created_at",
            )
            .bind(token)
            .fetch_optional(pool)
            .await?
        });
        row.map(ResetToken::try_from).transpose()
    }

    /// Remove every outstanding token for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("DELETE FROM reset_tokens WHERE user_id = $1")
                .bind(user_id.to_string())
                .execute(pool)
                .await?
                .rows_affected()
        });
        Ok(affected)
    }

    /// Remove tokens that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("DELETE FROM reset_tokens WHERE expires_at <= $1")
                .bind(now.timestamp_millis())
                .execute(pool)
                .await?
                .rows_affected()
        });
        Ok(affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::UserRepository;
    use crate::db::tests::memory_db;
    use crate::models::NewUser;

    async fn token_for_new_user(db: &Database, token: &str, expires_in: Duration) -> ResetToken {
        let email = Email::parse("reset@example.com").unwrap();
        let user = match UserRepository::new(db).get_by_email(&email).await.unwrap() {
            Some(user) => user,
            None => UserRepository::new(db)
                .create(NewUser {
                    email: Some(email.clone()),
                    first_name: "Zeynep".to_string(),
                    last_name: "Arslan".to_string(),
                    ..NewUser::default()
                })
                .await
                .unwrap(),
        };
        let now = Utc::now();
        ResetToken {
            token: token.to_string(),
            user_id: user.id,
            email,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let db = memory_db().await;
        let repo = ResetTokenRepository::new(&db);
        let token = token_for_new_user(&db, "tok1", Duration::minutes(30)).await;
        repo.save(&token).await.unwrap();

        let fetched = repo.get("tok1").await.unwrap().unwrap();
        assert_eq!(fetched.user_id, token.user_id);

        let consumed = repo.consume("tok1").await.unwrap();
        assert!(consumed.is_some());
        assert!(repo.consume("tok1").await.unwrap().is_none());
        assert!(repo.get("tok1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let db = memory_db().await;
        let repo = ResetTokenRepository::new(&db);
        let mut token = token_for_new_user(&db, "tok2", Duration::minutes(30)).await;
        repo.save(&token).await.unwrap();

        token.expires_at = token.created_at + Duration::minutes(5);
        repo.save(&token).await.unwrap();

        let fetched = repo.get("tok2").await.unwrap().unwrap();
        assert_eq!(
            fetched.expires_at.timestamp_millis(),
            token.expires_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = memory_db().await;
        let repo = ResetTokenRepository::new(&db);
        let live = token_for_new_user(&db, "live", Duration::minutes(30)).await;
        let stale = token_for_new_user(&db, "stale", Duration::minutes(-1)).await;
        repo.save(&live).await.unwrap();
        repo.save(&stale).await.unwrap();

        assert!(stale.is_expired_at(Utc::now()));
        assert_eq!(repo.delete_expired(Utc::now()).await.unwrap(), 1);
        assert!(repo.get("live").await.unwrap().is_some());
        assert!(repo.get("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let db = memory_db().await;
        let repo = ResetTokenRepository::new(&db);
        let a = token_for_new_user(&db, "a", Duration::minutes(30)).await;
        let b = token_for_new_user(&db, "b", Duration::minutes(30)).await;
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();

        assert_eq!(repo.delete_for_user(a.user_id).await.unwrap(), 2);
    }
}
