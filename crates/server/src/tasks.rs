//! Background maintenance tasks.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::db::{Database, ResetTokenRepository};

/// How often expired reset tokens are removed.
const RESET_TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Remove expired password reset tokens once.
///
/// # Errors
///
/// Returns `RepositoryError` if the delete fails.
pub async fn purge_expired_reset_tokens(db: &Database) -> Result<u64, crate::db::RepositoryError> {
    let removed = ResetTokenRepository::new(db)
        .delete_expired(Utc::now())
        .await?;
    if removed > 0 {
        tracing::info!(removed, "Expired reset tokens removed");
    }
    Ok(removed)
}

/// Start the hourly reset token cleanup.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_reset_token_cleanup(db: Database) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RESET_TOKEN_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = purge_expired_reset_tokens(&db).await {
                tracing::error!(error = %e, "Reset token cleanup failed");
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use duct_order_core::Email;

    use super::*;
    use crate::db::tests::memory_db;
    use crate::db::{ResetToken, UserRepository};
    use crate::models::NewUser;

    #[tokio::test]
    async fn test_purge_keeps_live_tokens() {
        let db = memory_db().await;
        let user = UserRepository::new(&db)
            .create(NewUser {
                email: Some(Email::parse("a@example.com").unwrap()),
                first_name: "Ali".to_string(),
                last_name: "Kaya".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();

        let tokens = ResetTokenRepository::new(&db);
        let now = Utc::now();
        for (token, expires_at) in [
            ("a".repeat(64), now - ChronoDuration::minutes(1)),
            ("b".repeat(64), now + ChronoDuration::minutes(30)),
        ] {
            tokens
                .save(&ResetToken {
                    token,
                    user_id: user.id,
                    email: Email::parse("a@example.com").unwrap(),
                    expires_at,
                    created_at: now,
                })
                .await
                .unwrap();
        }

        assert_eq!(purge_expired_reset_tokens(&db).await.unwrap(), 1);
        assert!(tokens.get(&"b".repeat(64)).await.unwrap().is_some());
    }
}
