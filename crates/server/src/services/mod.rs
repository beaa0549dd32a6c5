//! Business logic services.
//!
//! # Services
//!
//! - `auth` - User authentication (password, phone, Google) and password reset
//! - `otp` - One-time codes for phone sign-in
//! - `sms` - SMS delivery through Twilio
//! - `email` - Email delivery (password reset, welcome)
//! - `google` - Google OAuth 2.0 authorization-code client
//! - `analytics` - Event tracking and the admin summary

pub mod analytics;
pub mod auth;
pub mod email;
pub mod google;
pub mod otp;
pub mod sms;

use rand::Rng;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric string for tokens and OAuth state.
#[must_use]
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..TOKEN_CHARSET.len());
            char::from(TOKEN_CHARSET.get(idx).copied().unwrap_or(b'a'))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_shape() {
        let token = random_token(64);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_token(64));
    }
}
