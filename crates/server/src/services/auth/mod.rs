//! Authentication service.
//!
//! Covers the three sign-in methods (email/password, phone OTP, Google) and
//! password reset. OTP codes are checked by the caller through
//! [`crate::services::otp::OtpService`] before the phone methods here run.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use duct_order_core::{Email, PhoneNumber, UserId};

use crate::db::{Database, RepositoryError, ResetToken, ResetTokenRepository, UserRepository};
use crate::middleware::sanitize_text;
use crate::models::{NewUser, User};
use crate::services::google::GoogleProfile;
use crate::services::random_token;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum first/last name length, in characters.
const MAX_NAME_LENGTH: usize = 50;

/// Length of password reset tokens.
pub const RESET_TOKEN_LENGTH: usize = 64;

/// How long a reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 30;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-ZğüşıöçĞÜŞİÖÇ\s]+$").expect("name pattern is valid")
});

/// Which name field a validation message refers to.
#[derive(Debug, Clone, Copy)]
enum NameField {
    First,
    Last,
}

/// Input for email registration.
#[derive(Debug, Clone)]
pub struct PasswordRegistration<'r> {
    pub email: &'r str,
    pub password: &'r str,
    pub first_name: &'r str,
    pub last_name: &'r str,
}

/// Authentication service.
///
/// Handles registration, login for every method, and password reset.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: ResetTokenRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            users: UserRepository::new(db),
            tokens: ResetTokenRepository::new(db),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidName` if a name is empty, too long, or not letters.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        input: PasswordRegistration<'_>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(input.email)?;
        validate_password(input.password)?;
        let first_name = validate_name(input.first_name, NameField::First)?;
        let last_name = validate_name(input.last_name, NameField::Last)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(input.password)?;

        let user = self
            .users
            .create(NewUser {
                email: Some(email),
                password_hash: Some(password_hash),
                first_name,
                last_name,
                ..NewUser::default()
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered with email");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown, the
    /// account has no password, or the password is wrong.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Phone Authentication
    // =========================================================================

    /// Check that a phone number can receive an OTP for the given flow:
    /// login needs an existing account, registration needs none.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPhone` if the number is malformed.
    /// Returns `AuthError::PhoneNotRegistered` or `AuthError::PhoneAlreadyRegistered`.
    pub async fn check_phone_for(
        &self,
        phone: &str,
        is_login: bool,
    ) -> Result<PhoneNumber, AuthError> {
        let phone = PhoneNumber::parse(phone)?;
        let exists = self.users.get_by_phone(&phone).await?.is_some();
        match (is_login, exists) {
            (true, false) => Err(AuthError::PhoneNotRegistered),
            (false, true) => Err(AuthError::PhoneAlreadyRegistered),
            _ => Ok(phone),
        }
    }

    /// Create a phone-only account. The OTP must already be verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if a name is rejected.
    /// Returns `AuthError::PhoneAlreadyRegistered` if the number has an account.
    pub async fn register_with_phone(
        &self,
        phone: PhoneNumber,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        let first_name = validate_name(first_name, NameField::First)?;
        let last_name = validate_name(last_name, NameField::Last)?;

        let user = self
            .users
            .create(NewUser {
                phone: Some(phone),
                first_name,
                last_name,
                ..NewUser::default()
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::PhoneAlreadyRegistered,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered with phone");
        Ok(user)
    }

    /// Sign in by phone. The OTP must already be verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this number.
    pub async fn login_with_phone(&self, phone: &PhoneNumber) -> Result<User, AuthError> {
        self.users
            .get_by_phone(phone)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Google Authentication
    // =========================================================================

    /// Sign in with a Google profile.
    ///
    /// Looks up the Google ID first, then links the account with the same
    /// email, and otherwise creates a new user. Returns the user and whether
    /// it was just created.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingGoogleEmail` if an unknown profile has no
    /// usable email address.
    pub async fn login_with_google(
        &self,
        profile: &GoogleProfile,
    ) -> Result<(User, bool), AuthError> {
        if let Some(user) = self.users.get_by_google_id(&profile.sub).await? {
            return Ok((user, false));
        }

        let email = profile
            .email
            .as_deref()
            .filter(|_| profile.email_verified.unwrap_or(true))
            .map(Email::parse)
            .transpose()
            .map_err(|_| AuthError::MissingGoogleEmail)?
            .ok_or(AuthError::MissingGoogleEmail)?;

        if let Some(mut user) = self.users.get_by_email(&email).await? {
            self.users.link_google_id(user.id, &profile.sub).await?;
            user.google_id = Some(profile.sub.clone());
            tracing::info!(user_id = %user.id, "Linked Google account to existing user");
            return Ok((user, false));
        }

        let first_name = google_name(profile.given_name.as_deref())
            .unwrap_or_else(|| email.local_part().to_string());
        let last_name = google_name(profile.family_name.as_deref()).unwrap_or_default();

        let user = self
            .users
            .create(NewUser {
                email: Some(email),
                first_name,
                last_name,
                google_id: Some(profile.sub.clone()),
                ..NewUser::default()
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered with Google");
        Ok((user, true))
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account with this email.
    ///
    /// Returns `None` for unknown emails; callers must respond the same way
    /// in both cases. Earlier tokens for the user are revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        self.request_password_reset_at(email, Utc::now()).await
    }

    /// [`Self::request_password_reset`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_password_reset`].
    pub async fn request_password_reset_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(User, String)>, AuthError> {
        let email = Email::parse(email)?;
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(None);
        };

        self.tokens.delete_for_user(user.id).await?;

        let token = ResetToken {
            token: random_token(RESET_TOKEN_LENGTH),
            user_id: user.id,
            email,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            created_at: now,
        };
        self.tokens.save(&token).await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(Some((user, token.token)))
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    /// Returns `AuthError::InvalidResetToken` for unknown or used tokens.
    /// Returns `AuthError::ExpiredResetToken` for expired tokens.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AuthError> {
        self.reset_password_at(token, new_password, Utc::now())
            .await
    }

    /// [`Self::reset_password`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`Self::reset_password`].
    pub async fn reset_password_at(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        validate_password(new_password)?;
        if !is_token_shaped(token) {
            return Err(AuthError::InvalidResetToken);
        }

        let stored = self
            .tokens
            .consume(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;
        if stored.is_expired_at(now) {
            return Err(AuthError::ExpiredResetToken);
        }

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password(stored.user_id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %stored.user_id, "Password reset completed");
        self.get_user(stored.user_id).await
    }
}

/// Reset tokens are 32 to 128 ASCII alphanumerics.
fn is_token_shaped(token: &str) -> bool {
    (32..=128).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AuthError::WeakPassword(
            "Şifre en az 6, en fazla 128 karakter olmalıdır",
        ));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(AuthError::WeakPassword(
            "Şifre en az bir küçük harf, bir büyük harf ve bir rakam içermelidir",
        ));
    }

    Ok(())
}

/// Sanitize and validate a first or last name.
fn validate_name(raw: &str, field: NameField) -> Result<String, AuthError> {
    let name = sanitize_text(raw);
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_LENGTH || !NAME_PATTERN.is_match(&name) {
        return Err(AuthError::InvalidName(match field {
            NameField::First => "Ad sadece harflerden oluşmalıdır",
            NameField::Last => "Soyad sadece harflerden oluşmalıdır",
        }));
    }
    Ok(name)
}

/// Google names are free-form; keep them short and markup-free.
fn google_name(raw: Option<&str>) -> Option<String> {
    let name: String = sanitize_text(raw?).chars().take(MAX_NAME_LENGTH).collect();
    (!name.is_empty()).then_some(name)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::tests::memory_db;

    const PASSWORD: &str = "Kanal123";

    fn registration<'r>(email: &'r str) -> PasswordRegistration<'r> {
        PasswordRegistration {
            email,
            password: PASSWORD,
            first_name: "Ahmet",
            last_name: "Yıldız",
        }
    }

    fn profile(sub: &str, email: Option<&str>) -> GoogleProfile {
        GoogleProfile {
            sub: sub.to_string(),
            email: email.map(ToString::to_string),
            email_verified: Some(true),
            given_name: Some("Gül".to_string()),
            family_name: Some("Şahin".to_string()),
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Abc123").is_ok());
        assert!(matches!(
            validate_password("Ab1"),
            Err(AuthError::WeakPassword(m)) if m.contains("en az 6")
        ));
        assert!(matches!(
            validate_password("abcdef1"),
            Err(AuthError::WeakPassword(m)) if m.contains("büyük harf")
        ));
        assert!(validate_password(&format!("Aa1{}", "x".repeat(126))).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(
            validate_name("  Çağrı Öztürk ", NameField::First).unwrap(),
            "Çağrı Öztürk"
        );
        assert!(validate_name("<b></b>", NameField::First).is_err());
        assert!(validate_name("R2D2", NameField::Last).is_err());
        assert!(validate_name(&"a".repeat(51), NameField::First).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password(PASSWORD).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(PASSWORD, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password(PASSWORD, "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);

        let user = auth
            .register_with_password(registration("Ahmet@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email.as_ref().unwrap().as_str(), "ahmet@example.com");

        let logged_in = auth
            .login_with_password("ahmet@example.com", PASSWORD)
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);

        auth.register_with_password(registration("dup@example.com"))
            .await
            .unwrap();
        let err = auth
            .register_with_password(registration("DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        auth.register_with_password(registration("me@example.com"))
            .await
            .unwrap();

        let wrong_password = auth.login_with_password("me@example.com", "Wrong999").await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

        let unknown = auth.login_with_password("nobody@example.com", PASSWORD).await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_phone_checks_and_registration() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);

        assert!(matches!(
            auth.check_phone_for("05551112233", true).await,
            Err(AuthError::PhoneNotRegistered)
        ));
        let phone = auth.check_phone_for("05551112233", false).await.unwrap();

        let user = auth
            .register_with_phone(phone.clone(), "Elif", "Koç")
            .await
            .unwrap();
        assert_eq!(user.phone.as_ref(), Some(&phone));

        assert!(matches!(
            auth.check_phone_for("+90 555 111 22 33", false).await,
            Err(AuthError::PhoneAlreadyRegistered)
        ));
        let found = auth.login_with_phone(&phone).await.unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            auth.check_phone_for("12345", true).await,
            Err(AuthError::InvalidPhone(_))
        ));
    }

    #[tokio::test]
    async fn test_google_creates_then_finds() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);

        let (created, is_new) = auth
            .login_with_google(&profile("sub-1", Some("gul@example.com")))
            .await
            .unwrap();
        assert!(is_new);
        assert_eq!(created.first_name, "Gül");
        assert!(created.password_hash.is_none());

        let (again, is_new) = auth
            .login_with_google(&profile("sub-1", Some("gul@example.com")))
            .await
            .unwrap();
        assert!(!is_new);
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn test_google_links_existing_email_account() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        let existing = auth
            .register_with_password(registration("link@example.com"))
            .await
            .unwrap();

        let (linked, is_new) = auth
            .login_with_google(&profile("sub-2", Some("link@example.com")))
            .await
            .unwrap();
        assert!(!is_new);
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.google_id.as_deref(), Some("sub-2"));

        // Password login still works after linking
        assert!(auth.login_with_password("link@example.com", PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn test_google_without_email() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        let err = auth.login_with_google(&profile("sub-3", None)).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingGoogleEmail));
    }

    #[tokio::test]
    async fn test_password_reset_single_use() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        auth.register_with_password(registration("reset@example.com"))
            .await
            .unwrap();

        let (_, token) = auth
            .request_password_reset("reset@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.len(), RESET_TOKEN_LENGTH);

        auth.reset_password(&token, "Yeni456").await.unwrap();
        assert!(auth.login_with_password("reset@example.com", "Yeni456").await.is_ok());
        assert!(matches!(
            auth.login_with_password("reset@example.com", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));

        let reused = auth.reset_password(&token, "Baska789").await;
        assert!(matches!(reused, Err(AuthError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_password_reset_expired() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        auth.register_with_password(registration("late@example.com"))
            .await
            .unwrap();

        let issued = Utc::now() - Duration::minutes(RESET_TOKEN_TTL_MINUTES + 1);
        let (_, token) = auth
            .request_password_reset_at("late@example.com", issued)
            .await
            .unwrap()
            .unwrap();

        let result = auth.reset_password(&token, "Yeni456").await;
        assert!(matches!(result, Err(AuthError::ExpiredResetToken)));
    }

    #[tokio::test]
    async fn test_password_reset_unknown_email_and_new_request_revokes_old() {
        let db = memory_db().await;
        let auth = AuthService::new(&db);
        assert!(auth
            .request_password_reset("ghost@example.com")
            .await
            .unwrap()
            .is_none());

        auth.register_with_password(registration("twice@example.com"))
            .await
            .unwrap();
        let (_, first) = auth
            .request_password_reset("twice@example.com")
            .await
            .unwrap()
            .unwrap();
        let (_, second) = auth
            .request_password_reset("twice@example.com")
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            auth.reset_password(&first, "Yeni456").await,
            Err(AuthError::InvalidResetToken)
        ));
        assert!(auth.reset_password(&second, "Yeni456").await.is_ok());
    }
}
