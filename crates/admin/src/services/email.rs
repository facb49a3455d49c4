//! Email service for admin login codes.
//!
//! Uses SMTP via lettre. Bodies are plain text.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

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
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send an admin login code.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_login_code(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject("Your Emporium admin login code")
            .header(ContentType::TEXT_PLAIN)
            .body(login_code_body(code, ttl_minutes))?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, "Admin login code sent");
        Ok(())
    }
}

fn login_code_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Your admin login code is {code}\n\n\
         It expires in {ttl_minutes} minutes and can be used once.\n\
         If you did not try to sign in to the Emporium admin, rotate your admin key.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_code_body() {
        let body = login_code_body("482913", 10);
        assert!(body.contains("482913"));
        assert!(body.contains("10 minutes"));
    }
}
