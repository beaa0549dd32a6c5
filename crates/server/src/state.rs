//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::email::EmailService;
use crate::services::google::GoogleOAuthClient;
use crate::services::otp::OtpService;
use crate::services::sms::SmsService;

/// Timeout for outbound HTTP calls (Twilio, Google).
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database and outbound clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    db: Database,
    otp: OtpService,
    sms: SmsService,
    email: EmailService,
    google: Option<GoogleOAuthClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `db` - Connected (and migrated) database
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or SMTP transport can't be built.
    pub fn new(config: AppConfig, db: Database) -> Result<Self, StateError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let sms = SmsService::new(http.clone(), config.twilio.clone(), config.demo_mode);
        let email = EmailService::new(config.smtp.as_ref(), &config.client_url, config.demo_mode)?;
        let google = config
            .google
            .as_ref()
            .map(|google| GoogleOAuthClient::new(http, google));

        if sms.is_demo() {
            tracing::info!("SMS demo mode: codes are logged, not sent");
        }
        if email.is_demo() {
            tracing::info!("Email demo mode: messages are logged, not sent");
        }
        if google.is_none() {
            tracing::info!("Google OAuth not configured");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                otp: OtpService::new(),
                sms,
                email,
                google,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the OTP store.
    #[must_use]
    pub fn otp(&self) -> &OtpService {
        &self.inner.otp
    }

    /// Get a reference to the SMS sender.
    #[must_use]
    pub fn sms(&self) -> &SmsService {
        &self.inner.sms
    }

    /// Get a reference to the email sender.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get the Google OAuth client, if configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleOAuthClient> {
        self.inner.google.as_ref()
    }
}
