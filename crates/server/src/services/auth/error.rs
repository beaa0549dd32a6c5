//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] duct_order_core::EmailError),

    /// Invalid phone number format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] duct_order_core::PhoneError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Phone number already registered.
    #[error("phone already registered")]
    PhoneAlreadyRegistered,

    /// Phone number has no account.
    #[error("phone not registered")]
    PhoneNotRegistered,

    /// Password too weak or invalid. Carries the user-facing message.
    #[error("password validation failed: {0}")]
    WeakPassword(&'static str),

    /// First or last name rejected. Carries the user-facing message.
    #[error("name validation failed: {0}")]
    InvalidName(&'static str),

    /// Reset token unknown or already used.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// Reset token past its expiry.
    #[error("expired reset token")]
    ExpiredResetToken,

    /// Google returned a profile without an email address.
    #[error("google profile has no email")]
    MissingGoogleEmail,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
