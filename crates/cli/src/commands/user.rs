//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # List every user
//! duct-cli user list
//!
//! # Promote a user to admin
//! duct-cli user set-role -e admin@example.com -r admin
//! ```

use duct_order_core::{Email, Role};
use duct_order_server::db::UserRepository;
use duct_order_server::models::User;

use super::{CommandError, connect};

/// One row of `user list` output.
fn describe(user: &User) -> String {
    format!(
        "{}  {:<6} {:<32} {}  (created {})",
        user.id,
        user.role,
        user.contact(),
        user.full_name(),
        user.created_at.format("%Y-%m-%d"),
    )
}

/// Print every user, newest first.
///
/// # Errors
///
/// Returns `CommandError` if the database can't be read.
pub async fn list() -> Result<(), CommandError> {
    let db = connect().await?;
    let users = UserRepository::new(&db).list_all().await?;

    #[allow(clippy::print_stdout)]
    {
        for user in &users {
            println!("{}", describe(user));
        }
        println!("{} user(s)", users.len());
    }

    db.close().await;
    Ok(())
}

/// Change the role of the user with `email`.
///
/// # Errors
///
/// Returns `CommandError` if the role or email is invalid, the user doesn't
/// exist, or the update fails.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let role: Role = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;

    let db = connect().await?;
    let users = UserRepository::new(&db);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(email.to_string()))?;

    let updated = users.set_role(user.id, role).await?;
    tracing::info!(
        "Role of {} changed from {} to {}",
        email,
        user.role,
        updated.role
    );

    db.close().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use duct_order_core::UserId;

    use super::*;

    #[test]
    fn test_describe_shows_contact_and_role() {
        let now = Utc::now();
        let user = User {
            id: UserId::new_v4(),
            email: Some(Email::parse("admin@example.com").unwrap()),
            phone: None,
            password_hash: None,
            first_name: "Ayşe".to_string(),
            last_name: "Demir".to_string(),
            google_id: None,
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };
        let line = describe(&user);
        assert!(line.contains("admin@example.com"));
        assert!(line.contains("admin "));
        assert!(line.contains("Ayşe Demir"));
    }
}
