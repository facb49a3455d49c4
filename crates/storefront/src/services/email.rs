//! Email service for login codes, order confirmations and contact notices.
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
use crate::models::OrderDetail;

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
    support_address: Option<String>,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// The transport connects lazily, so this does not touch the network.
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
            support_address: config.support_address.clone(),
        })
    }

    /// Send a login code.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_otp_code(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        self.send_text_email(to, "Your Emporium login code", &otp_body(code, ttl_minutes))
            .await
    }

    /// Send an order confirmation after payment.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        order: &OrderDetail,
    ) -> Result<(), EmailError> {
        let subject = format!("Order {} confirmed", order.order_number);
        self.send_text_email(to, &subject, &order_confirmation_body(order))
            .await
    }

    /// Forward a contact form submission to the support inbox.
    ///
    /// Does nothing when no support address is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_contact_notification(
        &self,
        name: &str,
        reply_to: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<(), EmailError> {
        let Some(support) = self.support_address.as_deref() else {
            return Ok(());
        };

        let subject = format!("Contact: {}", subject.unwrap_or("(no subject)"));
        let body = format!("From: {name} <{reply_to}>\n\n{message}\n");
        self.send_text_email(support, &subject, &body).await
    }

    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn otp_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Your login code is {code}\n\n\
         It expires in {ttl_minutes} minutes. If you did not request it, ignore this email.\n"
    )
}

fn order_confirmation_body(order: &OrderDetail) -> String {
    use std::fmt::Write;

    let mut body = format!(
        "Thank you for your order {}.\n\n",
        order.order_number
    );
    for item in &order.items {
        let _ = writeln!(
            body,
            "{} x {} @ {} {:.2} = {:.2}",
            item.quantity, item.product_name, order.currency, item.unit_price, item.line_total
        );
    }
    let _ = writeln!(body, "\nTotal: {} {:.2}", order.currency, order.total);
    body
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use emporium_core::{Currency, OrderId, OrderItemId, OrderStatus, ProductId};

    use super::*;
    use crate::models::OrderItem;

    #[test]
    fn test_otp_body_mentions_code_and_ttl() {
        let body = otp_body("042917", 10);
        assert!(body.contains("042917"));
        assert!(body.contains("10 minutes"));
    }

    #[test]
    fn test_order_confirmation_lists_items() {
        let order = OrderDetail {
            id: OrderId::generate(),
            order_number: "EMP-20260101-ABC123".to_owned(),
            status: OrderStatus::Paid,
            subtotal: Decimal::new(99_800, 2),
            total: Decimal::new(99_800, 2),
            currency: Currency::INR,
            shipping_address: serde_json::json!({}),
            items: vec![OrderItem {
                id: OrderItemId::generate(),
                product_id: ProductId::generate(),
                product_name: "Desk Lamp".to_owned(),
                unit_price: Decimal::new(49_900, 2),
                quantity: 2,
                line_total: Decimal::new(99_800, 2),
            }],
            payment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let body = order_confirmation_body(&order);
        assert!(body.contains("EMP-20260101-ABC123"));
        assert!(body.contains("2 x Desk Lamp @ INR 499.00 = 998.00"));
        assert!(body.contains("Total: INR 998.00"));
    }
}
