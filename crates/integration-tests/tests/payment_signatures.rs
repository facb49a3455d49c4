//! Gateway signature checks as the storefront performs them.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;

use emporium_integration_tests::storefront_config;
use emporium_storefront::services::razorpay::{RazorpayClient, sign};

const KEY_SECRET: &str = "rzp_test_secret_value";

#[test]
fn test_checkout_signature_round_trip() {
    let client = RazorpayClient::new(&storefront_config().unwrap().razorpay).unwrap();
    let signature = sign(KEY_SECRET, b"order_Nx1|pay_Qy2").unwrap();

    assert!(
        client
            .verify_payment_signature("order_Nx1", "pay_Qy2", &signature)
            .is_ok()
    );
    assert!(
        client
            .verify_payment_signature("order_Nx1", "pay_OTHER", &signature)
            .is_err()
    );
    assert!(
        client
            .verify_payment_signature("order_Nx1", "pay_Qy2", "not-hex")
            .is_err()
    );
}

#[test]
fn test_webhooks_disabled_without_secret() {
    let client = RazorpayClient::new(&storefront_config().unwrap().razorpay).unwrap();
    assert!(!client.webhooks_enabled());
    assert!(client.verify_webhook_signature(b"{}", "00").is_err());
}

#[test]
fn test_webhook_signature_with_secret() {
    let mut config = storefront_config().unwrap().razorpay;
    config.webhook_secret = Some(SecretString::from("whsec_integration".to_owned()));
    let client = RazorpayClient::new(&config).unwrap();

    let body = br#"{"event":"payment.captured"}"#;
    let signature = sign("whsec_integration", body).unwrap();

    assert!(client.webhooks_enabled());
    assert!(client.verify_webhook_signature(body, &signature).is_ok());
    assert!(
        client
            .verify_webhook_signature(br#"{"event":"payment.failed"}"#, &signature)
            .is_err()
    );
}
