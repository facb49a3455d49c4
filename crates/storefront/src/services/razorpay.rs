//! Razorpay API client for payment orders and signature checks.
//!
//! Checkout is split between server and browser: the server creates a
//! gateway order for the amount it computed, the browser completes payment
//! with the gateway, then posts back `(order_id, payment_id, signature)`.
//! The signature is `HMAC_SHA256(key_secret, "{order_id}|{payment_id}")` as
//! lowercase hex. Webhooks are signed with a separate webhook secret over
//! the raw request body.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when interacting with Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// No webhook secret is configured.
    #[error("webhooks are not configured")]
    WebhookDisabled,

    /// Failed to parse a payload.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// A gateway order as returned by `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order ID (`order_...`).
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Our order number.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Gateway-side status (`created`, `attempted`, `paid`).
    #[serde(default)]
    pub status: Option<String>,
}

/// A webhook delivery. Only payment events are acted on.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event name, e.g. `payment.captured`.
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

/// Payment fields carried by payment webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    /// Gateway payment ID (`pay_...`).
    pub id: String,
    /// Gateway order the payment belongs to.
    pub order_id: Option<String>,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookEvent {
    /// The payment entity, if this is a payment event.
    #[must_use]
    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    orders_url: String,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: Option<SecretString>,
}

impl RazorpayClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, RazorpayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            orders_url: format!("{}/orders", config.api_base.as_str().trim_end_matches('/')),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    /// Public key ID, handed to the browser checkout.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order for `amount` minor units.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .client
            .post(&self.orders_url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&CreateOrderRequest {
                amount,
                currency,
                receipt,
            })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| RazorpayError::Parse(e.to_string()))?;

        debug!(gateway_order_id = %order.id, "Gateway order created");
        Ok(order)
    }

    /// Verify the checkout signature posted back by the browser.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        verify_hmac(
            &self.key_secret,
            format!("{gateway_order_id}|{gateway_payment_id}").as_bytes(),
            signature,
        )
    }

    /// Verify a webhook body against the `X-Razorpay-Signature` header.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::WebhookDisabled` without a webhook secret,
    /// `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), RazorpayError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or(RazorpayError::WebhookDisabled)?;
        verify_hmac(secret, body, signature)
    }

    /// Whether webhooks are accepted at all.
    #[must_use]
    pub const fn webhooks_enabled(&self) -> bool {
        self.webhook_secret.is_some()
    }
}

/// Hex HMAC-SHA256 of `message` under `secret`, as the gateway computes it.
///
/// # Errors
///
/// Returns `RazorpayError::Parse` if the key is rejected.
pub fn sign(secret: &str, message: &[u8]) -> Result<String, RazorpayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RazorpayError::Parse(e.to_string()))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hmac(secret: &SecretString, message: &[u8], signature: &str) -> Result<(), RazorpayError> {
    let expected = hex::decode(signature.trim()).map_err(|_| RazorpayError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| RazorpayError::InvalidSignature)?;
    mac.update(message);

    // Constant-time comparison
    mac.verify_slice(&expected)
        .map_err(|_| RazorpayError::InvalidSignature)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    const KEY_SECRET: &str = "rzp_test_secret_value";
    const WEBHOOK_SECRET: &str = "whsec_test_value";

    fn client(webhook: bool) -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from(KEY_SECRET.to_owned()),
            webhook_secret: webhook.then(|| SecretString::from(WEBHOOK_SECRET.to_owned())),
            api_base: Url::parse("https://api.razorpay.com/v1/").unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn test_orders_url_strips_trailing_slash() {
        assert_eq!(client(false).orders_url, "https://api.razorpay.com/v1/orders");
    }

    #[test]
    fn test_payment_signature_roundtrip() {
        let c = client(false);
        let sig = sign(KEY_SECRET, b"order_ABC|pay_XYZ").unwrap();
        assert!(c.verify_payment_signature("order_ABC", "pay_XYZ", &sig).is_ok());
    }

    #[test]
    fn test_payment_signature_rejects_swapped_ids() {
        let c = client(false);
        let sig = sign(KEY_SECRET, b"order_ABC|pay_XYZ").unwrap();
        assert!(matches!(
            c.verify_payment_signature("order_ABC", "pay_OTHER", &sig),
            Err(RazorpayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_payment_signature_rejects_non_hex() {
        let c = client(false);
        assert!(c.verify_payment_signature("order_ABC", "pay_XYZ", "zz-not-hex").is_err());
    }

    #[test]
    fn test_webhook_signature() {
        let c = client(true);
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign(WEBHOOK_SECRET, body).unwrap();
        assert!(c.verify_webhook_signature(body, &sig).is_ok());
        // Signed with the key secret instead of the webhook secret.
        let wrong = sign(KEY_SECRET, body).unwrap();
        assert!(c.verify_webhook_signature(body, &wrong).is_err());
    }

    #[test]
    fn test_webhook_disabled_without_secret() {
        let c = client(false);
        assert!(matches!(
            c.verify_webhook_signature(b"{}", "00"),
            Err(RazorpayError::WebhookDisabled)
        ));
    }

    #[test]
    fn test_webhook_event_parsing() {
        let json = r#"{
            "entity": "event",
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_1", "order_id": "order_1", "amount": 49900, "status": "captured"}}}
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, "payment.captured");
        let payment = event.payment().unwrap();
        assert_eq!(payment.id, "pay_1");
        assert_eq!(payment.order_id.as_deref(), Some("order_1"));
    }
}
