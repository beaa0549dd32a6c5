//! One-time codes for phone sign-in.
//!
//! Codes live in memory only. A restart invalidates every outstanding code,
//! and users simply request a new one.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use rand::Rng;
use thiserror::Error;

use duct_order_core::PhoneNumber;

/// How long a code stays valid.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Wrong guesses allowed before the code is discarded.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Upper bound on outstanding codes.
const MAX_ENTRIES: u64 = 10_000;

/// What a code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Login,
    Register,
}

impl OtpPurpose {
    /// Pick the purpose from the client's `isLogin` flag.
    #[must_use]
    pub const fn from_is_login(is_login: bool) -> Self {
        if is_login { Self::Login } else { Self::Register }
    }
}

/// Errors from code verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("no code outstanding for this number")]
    InvalidOrExpired,
    #[error("code expired")]
    Expired,
    #[error("wrong code")]
    InvalidCode,
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    purpose: OtpPurpose,
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
}

/// Issues and checks one-time codes, keyed by phone number.
#[derive(Clone)]
pub struct OtpService {
    entries: Cache<String, OtpEntry>,
}

impl Default for OtpService {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpService {
    /// Create an empty code store.
    #[must_use]
    pub fn new() -> Self {
        let ttl = StdDuration::from_secs(u64::try_from(OTP_TTL_MINUTES * 60).unwrap_or(300));
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Issue a fresh code, replacing any earlier one for this number.
    pub async fn issue(&self, phone: &PhoneNumber, purpose: OtpPurpose) -> String {
        self.issue_at(phone, purpose, Utc::now()).await
    }

    /// [`Self::issue`] with an explicit clock.
    pub async fn issue_at(
        &self,
        phone: &PhoneNumber,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> String {
        let code = rand::rng().random_range(100_000..1_000_000).to_string();
        self.entries
            .insert(
                phone.as_str().to_string(),
                OtpEntry {
                    code: code.clone(),
                    purpose,
                    expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
                    failed_attempts: 0,
                },
            )
            .await;
        tracing::debug!(phone = %phone.masked(), ?purpose, "OTP issued");
        code
    }

    /// Check a code. A correct code is consumed.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidOrExpired` when nothing is outstanding.
    /// Returns `OtpError::Expired` when the code timed out.
    /// Returns `OtpError::InvalidCode` for a wrong code or purpose.
    pub async fn verify(
        &self,
        phone: &PhoneNumber,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), OtpError> {
        self.verify_at(phone, code, purpose, Utc::now()).await
    }

    /// [`Self::verify`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub async fn verify_at(
        &self,
        phone: &PhoneNumber,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let key = phone.as_str().to_string();
        let Some(mut entry) = self.entries.get(&key).await else {
            return Err(OtpError::InvalidOrExpired);
        };

        if entry.expires_at <= now {
            self.entries.invalidate(&key).await;
            return Err(OtpError::Expired);
        }

        if entry.purpose != purpose || entry.code != code {
            entry.failed_attempts += 1;
            if entry.failed_attempts >= MAX_FAILED_ATTEMPTS {
                tracing::warn!(phone = %phone.masked(), "OTP discarded after repeated failures");
                self.entries.invalidate(&key).await;
            } else {
                self.entries.insert(key, entry).await;
            }
            return Err(OtpError::InvalidCode);
        }

        self.entries.invalidate(&key).await;
        Ok(())
    }
}

/// Codes are exactly six ASCII digits.
#[must_use]
pub fn is_code_shaped(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("05321234567").unwrap()
    }

    #[tokio::test]
    async fn test_issue_and_verify_once() {
        let otp = OtpService::new();
        let code = otp.issue(&phone(), OtpPurpose::Login).await;
        assert!(is_code_shaped(&code));

        assert_eq!(otp.verify(&phone(), &code, OtpPurpose::Login).await, Ok(()));
        assert_eq!(
            otp.verify(&phone(), &code, OtpPurpose::Login).await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_missing_code() {
        let otp = OtpService::new();
        assert_eq!(
            otp.verify(&phone(), "123456", OtpPurpose::Register).await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_expired_code_is_removed() {
        let otp = OtpService::new();
        let issued = Utc::now() - Duration::minutes(OTP_TTL_MINUTES + 1);
        let code = otp.issue_at(&phone(), OtpPurpose::Login, issued).await;

        assert_eq!(
            otp.verify(&phone(), &code, OtpPurpose::Login).await,
            Err(OtpError::Expired)
        );
        assert_eq!(
            otp.verify(&phone(), &code, OtpPurpose::Login).await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_wrong_purpose_rejected() {
        let otp = OtpService::new();
        let code = otp.issue(&phone(), OtpPurpose::Register).await;
        assert_eq!(
            otp.verify(&phone(), &code, OtpPurpose::Login).await,
            Err(OtpError::InvalidCode)
        );
        // Still usable for the right purpose
        assert_eq!(otp.verify(&phone(), &code, OtpPurpose::Register).await, Ok(()));
    }

    #[tokio::test]
    async fn test_discarded_after_max_failures() {
        let otp = OtpService::new();
        let code = otp.issue(&phone(), OtpPurpose::Login).await;
        let wrong = if code == "999999" { "999998" } else { "999999" };

        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                otp.verify(&phone(), wrong, OtpPurpose::Login).await,
                Err(OtpError::InvalidCode)
            );
        }
        assert_eq!(
            otp.verify(&phone(), &code, OtpPurpose::Login).await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_reissue_replaces_code() {
        let otp = OtpService::new();
        let first = otp.issue(&phone(), OtpPurpose::Login).await;
        let second = otp.issue(&phone(), OtpPurpose::Login).await;
        if first != second {
            assert_eq!(
                otp.verify(&phone(), &first, OtpPurpose::Login).await,
                Err(OtpError::InvalidCode)
            );
        }
        assert_eq!(otp.verify(&phone(), &second, OtpPurpose::Login).await, Ok(()));
    }

    #[test]
    fn test_code_shape() {
        assert!(is_code_shaped("004211"));
        assert!(!is_code_shaped("12345"));
        assert!(!is_code_shaped("12a456"));
    }
}
