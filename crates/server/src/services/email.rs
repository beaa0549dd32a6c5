//! Email service for password reset and welcome messages.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! settings, or in demo mode, messages are logged instead of sent.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use duct_order_core::Email;

use crate::config::SmtpConfig;
use crate::services::auth::RESET_TOKEN_TTL_MINUTES;

/// Subject of the password reset email.
pub const RESET_SUBJECT: &str = "Şifre Sıfırlama Talebi";

/// Subject of the welcome email.
pub const WELCOME_SUBJECT: &str = "Hoş Geldiniz! - Hava Kanalı Sipariş Sistemi";

/// HTML template for password reset email.
#[derive(Template)]
#[template(path = "email/reset_password.html")]
struct ResetPasswordEmailHtml<'a> {
    name: &'a str,
    reset_link: &'a str,
    valid_minutes: i64,
}

/// Plain text template for password reset email.
#[derive(Template)]
#[template(path = "email/reset_password.txt")]
struct ResetPasswordEmailText<'a> {
    name: &'a str,
    reset_link: &'a str,
    valid_minutes: i64,
}

/// HTML template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    client_url: &'a str,
}

/// Plain text template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    client_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    client_url: String,
}

impl EmailService {
    /// Create a new email service. `smtp` is ignored in demo mode.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay can't be set up.
    pub fn new(
        smtp: Option<&SmtpConfig>,
        client_url: &str,
        demo_mode: bool,
    ) -> Result<Self, SmtpError> {
        let client_url = client_url.trim_end_matches('/').to_string();
        let Some(config) = smtp.filter(|_| !demo_mode) else {
            return Ok(Self {
                mailer: None,
                from_address: String::new(),
                client_url,
            });
        };

        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(mailer),
            from_address: config.from_address.clone(),
            client_url,
        })
    }

    /// Whether messages are only logged.
    #[must_use]
    pub const fn is_demo(&self) -> bool {
        self.mailer.is_none()
    }

    /// Link the user follows to choose a new password.
    #[must_use]
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.client_url,
            urlencoding::encode(token)
        )
    }

    /// Send the password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &Email,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let reset_link = self.reset_link(token);
        let html = ResetPasswordEmailHtml {
            name,
            reset_link: &reset_link,
            valid_minutes: RESET_TOKEN_TTL_MINUTES,
        }
        .render()?;
        let text = ResetPasswordEmailText {
            name,
            reset_link: &reset_link,
            valid_minutes: RESET_TOKEN_TTL_MINUTES,
        }
        .render()?;

        self.send_multipart_email(to, RESET_SUBJECT, &text, &html)
            .await
    }

    /// Send a welcome email after successful registration.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(&self, to: &Email, name: &str) -> Result<(), EmailError> {
        let client_url = self.client_url.as_str();
        let html = WelcomeEmailHtml { name, client_url }.render()?;
        let text = WelcomeEmailText { name, client_url }.render()?;

        self.send_multipart_email(to, WELCOME_SUBJECT, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &Email,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, subject = %subject, body = %text_body, "Demo email (not sent)");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn demo() -> EmailService {
        EmailService::new(None, "https://siparis.example.com/", false).unwrap()
    }

    #[test]
    fn test_reset_link() {
        assert_eq!(
            demo().reset_link("abc123"),
            "https://siparis.example.com/reset-password?token=abc123"
        );
    }

    #[test]
    fn test_reset_template_contains_link_and_validity() {
        let link = demo().reset_link("tok");
        let text = ResetPasswordEmailText {
            name: "Ayşe",
            reset_link: &link,
            valid_minutes: RESET_TOKEN_TTL_MINUTES,
        }
        .render()
        .unwrap();
        assert!(text.contains("Merhaba Ayşe"));
        assert!(text.contains(&link));
        assert!(text.contains("30 dakika"));
    }

    #[test]
    fn test_welcome_html_escapes_name() {
        let html = WelcomeEmailHtml {
            name: "<b>Ali</b>",
            client_url: "https://siparis.example.com",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<b>Ali</b>"));
        assert!(html.contains("https://siparis.example.com"));
    }

    #[tokio::test]
    async fn test_demo_send_succeeds() {
        let service = demo();
        assert!(service.is_demo());
        let to = Email::parse("ayse@example.com").unwrap();
        service.send_welcome(&to, "Ayşe").await.unwrap();
        service.send_password_reset(&to, "Ayşe", "tok").await.unwrap();
    }
}
