//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use duct_order_core::{Email, PhoneNumber, Role, UserId};

/// A registered user (domain type).
///
/// Every user has at least one of `email` or `phone`. Implements `Debug`
/// manually so the password hash never reaches logs.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Email address, lowercase.
    pub email: Option<Email>,
    /// Mobile number in E.164 form.
    pub phone: Option<PhoneNumber>,
    /// Argon2id PHC string; absent for Google and phone-only users.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Google account subject identifier.
    pub google_id: Option<String>,
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("phone", &self.phone.as_ref().map(PhoneNumber::masked))
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("google_id", &self.google_id)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The address used to reach the user: email if present, else phone.
    #[must_use]
    pub fn contact(&self) -> String {
        self.email.as_ref().map_or_else(
            || {
                self.phone
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            },
            ToString::to_string,
        )
    }
}

/// Fields supplied when creating a user; the repository assigns ID,
/// role and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub google_id: Option<String>,
}

/// User as returned by the JSON API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneNumber>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new_v4(),
            email: None,
            phone: Some(PhoneNumber::parse("05551234567").unwrap()),
            password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
            first_name: "Ayşe".to_string(),
            last_name: "Yılmaz".to_string(),
            google_id: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_debug_hides_hash_and_phone() {
        let debug = format!("{:?}", user());
        assert!(!debug.contains("argon2id"));
        assert!(!debug.contains("5551234567"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_contact_falls_back_to_phone() {
        let mut u = user();
        assert_eq!(u.contact(), "+905551234567");
        u.email = Some(Email::parse("ayse@example.com").unwrap());
        assert_eq!(u.contact(), "ayse@example.com");
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(UserResponse::from(&user())).unwrap();
        assert_eq!(json["firstName"], "Ayşe");
        assert_eq!(json["phone"], "+905551234567");
        assert_eq!(json["role"], "user");
        assert!(json.get("email").is_none());
        assert!(json.get("passwordHash").is_none());
    }
}
