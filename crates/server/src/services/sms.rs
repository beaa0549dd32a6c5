//! Twilio client for verification SMS.
//!
//! Without Twilio credentials, or with `DEMO_MODE` on, messages are written
//! to the log instead and the caller is told the send was a demo.

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use duct_order_core::PhoneNumber;

use crate::config::TwilioConfig;

/// Twilio REST API base URL.
const BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Errors that can occur when sending SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Outcome of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    /// True when the message was only logged.
    pub demo: bool,
    /// Twilio message SID for real sends.
    pub sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

/// SMS sender.
#[derive(Clone)]
pub struct SmsService {
    client: reqwest::Client,
    twilio: Option<TwilioConfig>,
}

impl SmsService {
    /// Create a sender. `twilio` is ignored in demo mode.
    #[must_use]
    pub fn new(client: reqwest::Client, twilio: Option<TwilioConfig>, demo_mode: bool) -> Self {
        Self {
            client,
            twilio: twilio.filter(|_| !demo_mode),
        }
    }

    /// Whether messages are only logged.
    #[must_use]
    pub const fn is_demo(&self) -> bool {
        self.twilio.is_none()
    }

    /// Send a verification code.
    ///
    /// # Errors
    ///
    /// Returns error if the Twilio request fails.
    pub async fn send_otp(&self, phone: &PhoneNumber, code: &str) -> Result<SmsReceipt, SmsError> {
        let body = format!("Air Duct Order doğrulama kodunuz: {code}. Bu kod 5 dakika geçerlidir.");
        self.send(phone, &body).await
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns error if the Twilio request fails.
    pub async fn send(&self, phone: &PhoneNumber, body: &str) -> Result<SmsReceipt, SmsError> {
        let Some(twilio) = &self.twilio else {
            tracing::info!(phone = %phone.masked(), message = %body, "Demo SMS (not sent)");
            return Ok(SmsReceipt {
                demo: true,
                sid: None,
            });
        };

        let url = format!("{BASE_URL}/Accounts/{}/Messages.json", twilio.account_sid);
        let params = [
            ("To", phone.as_str()),
            ("From", twilio.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&twilio.account_sid, Some(twilio.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SmsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let message: MessageResponse = response.json().await?;
        tracing::info!(phone = %phone.masked(), sid = %message.sid, "SMS sent");
        Ok(SmsReceipt {
            demo: false,
            sid: Some(message.sid),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn twilio() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC0123456789abcdef".to_string(),
            auth_token: SecretString::from("k8Jq2mZx9Lp4Vw7Rt1Ys"),
            from_number: "+15005550006".to_string(),
        }
    }

    #[test]
    fn test_demo_mode_overrides_credentials() {
        let client = reqwest::Client::new();
        assert!(SmsService::new(client.clone(), Some(twilio()), true).is_demo());
        assert!(SmsService::new(client.clone(), None, false).is_demo());
        assert!(!SmsService::new(client, Some(twilio()), false).is_demo());
    }

    #[tokio::test]
    async fn test_demo_send_reports_demo() {
        let sms = SmsService::new(reqwest::Client::new(), None, false);
        let phone = PhoneNumber::parse("5551234567").unwrap();
        let receipt = sms.send_otp(&phone, "123456").await.unwrap();
        assert_eq!(
            receipt,
            SmsReceipt {
                demo: true,
                sid: None
            }
        );
    }
}
