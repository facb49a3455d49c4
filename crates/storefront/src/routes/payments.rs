//! Checkout and payment route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::ShippingAddress;
use crate::services::checkout::{
    CheckoutItem, CheckoutService, CheckoutSession, ConfirmedPayment, PaymentConfirmation,
};
use crate::state::AppState;

/// Header carrying the webhook body signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// `POST /api/payments/orders` body.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: ShippingAddress,
}

fn checkout(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(
        state.pool(),
        state.razorpay(),
        state.email(),
        state.config().currency,
    )
}

/// Price the cart and open a gateway order.
///
/// POST /api/payments/orders
#[instrument(skip(state, body), fields(user_id = %customer.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutSession>)> {
    let session = checkout(&state)
        .place_order(customer.id, &body.items, body.shipping_address)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Verify the signature returned by the browser checkout.
///
/// POST /api/payments/verify
#[instrument(skip(state, body), fields(user_id = %customer.id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Json(body): Json<PaymentConfirmation>,
) -> Result<Json<ConfirmedPayment>> {
    let confirmed = checkout(&state).confirm_payment(customer.id, &body).await?;
    Ok(Json(confirmed))
}

/// Gateway webhook.
///
/// POST /api/payments/webhook
///
/// The signature covers the raw body, so the body is taken as bytes.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    if !state.razorpay().webhooks_enabled() {
        return Err(AppError::NotFound("Webhook endpoint".to_string()));
    }

    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;

    checkout(&state).handle_webhook(&body, signature).await?;

    Ok(Json(json!({ "status": "ok" })))
}
