//! Checkout: pricing, gateway order creation, and payment finalization.
//!
//! Prices always come from the database. The client only names products
//! and quantities; anything else it sends about money is ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use emporium_core::{Currency, Money, MoneyError, OrderId, OrderStatus, ProductId, UserId};

use crate::db::catalog::CheckoutProduct;
use crate::db::orders::{FinalizeOutcome, NewOrder, NewOrderItem, PaymentRecord};
use crate::db::{CatalogRepository, OrderRepository, RepositoryError};
use crate::models::ShippingAddress;
use crate::services::email::EmailService;
use crate::services::razorpay::{RazorpayClient, RazorpayError, WebhookEvent};

/// Most distinct lines an order may have.
pub const MAX_LINES: usize = 50;

/// Largest quantity of one product per order.
pub const MAX_QUANTITY: u32 = 100;

/// Attempts at a unique order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Characters used in order number suffixes (no 0/O, 1/I).
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed request.
    #[error("{0}")]
    Validation(String),

    /// Product does not exist or is not for sale.
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    /// Not enough stock for the requested quantity.
    #[error("only {available} left in stock for product {product_id}")]
    InsufficientStock { product_id: ProductId, available: i32 },

    /// Order or payment not found (or not owned by the caller).
    #[error("order not found")]
    NotFound,

    /// Payment signature did not verify.
    #[error("payment signature verification failed")]
    InvalidSignature,

    /// Webhook endpoint is disabled.
    #[error("webhooks are not configured")]
    WebhookDisabled,

    /// Webhook body could not be parsed.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Gateway call failed.
    #[error("payment gateway error: {0}")]
    Gateway(#[source] RazorpayError),

    /// Amount arithmetic failed.
    #[error("amount error: {0}")]
    Money(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RazorpayError> for CheckoutError {
    fn from(err: RazorpayError) -> Self {
        match err {
            RazorpayError::InvalidSignature => Self::InvalidSignature,
            RazorpayError::WebhookDisabled => Self::WebhookDisabled,
            other => Self::Gateway(other),
        }
    }
}

/// One requested line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Lines priced from database rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<NewOrderItem>,
    pub subtotal: Money,
}

/// What the browser needs to open the gateway checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub order_id: OrderId,
    pub order_number: String,
    pub gateway_order_id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: Currency,
    pub key_id: String,
}

/// Payment details posted back after a browser checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Order state after a successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedPayment {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Merge duplicate lines, check limits and stock, and price each line.
///
/// Lines keep the order in which products first appear in the request.
///
/// # Errors
///
/// Returns `CheckoutError::Validation` for empty, oversized or zero-quantity
/// requests, `CheckoutError::ProductUnavailable` for unknown or inactive
/// products, and `CheckoutError::InsufficientStock` when stock is short.
pub fn build_order_lines(
    requested: &[CheckoutItem],
    products: &[CheckoutProduct],
    currency: Currency,
) -> Result<PricedOrder, CheckoutError> {
    if requested.is_empty() {
        return Err(CheckoutError::Validation(
            "at least one item is required".to_owned(),
        ));
    }
    if requested.len() > MAX_LINES {
        return Err(CheckoutError::Validation(format!(
            "at most {MAX_LINES} items per order"
        )));
    }

    let mut merged: Vec<(ProductId, u32)> = Vec::with_capacity(requested.len());
    for item in requested {
        if item.quantity == 0 {
            return Err(CheckoutError::Validation(
                "quantity must be at least 1".to_owned(),
            ));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, qty)) => *qty = qty.saturating_add(item.quantity),
            None => merged.push((item.product_id, item.quantity)),
        }
    }

    let by_id: HashMap<ProductId, &CheckoutProduct> =
        products.iter().map(|p| (p.id, p)).collect();

    let mut subtotal = Money::zero(currency);
    let mut items = Vec::with_capacity(merged.len());
    for (product_id, quantity) in merged {
        if quantity > MAX_QUANTITY {
            return Err(CheckoutError::Validation(format!(
                "quantity must be at most {MAX_QUANTITY}"
            )));
        }

        let product = by_id
            .get(&product_id)
            .filter(|p| p.is_active)
            .ok_or(CheckoutError::ProductUnavailable(product_id))?;

        let wanted = i32::try_from(quantity)
            .map_err(|_| CheckoutError::Validation("quantity out of range".to_owned()))?;
        if product.stock_qty < wanted {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                available: product.stock_qty.max(0),
            });
        }

        let line = Money::new(product.price, currency).times(quantity)?;
        subtotal = subtotal.checked_add(line.amount)?;
        items.push(NewOrderItem {
            product_id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: wanted,
            line_total: line.amount,
        });
    }

    Ok(PricedOrder { items, subtotal })
}

/// Human-friendly order number, e.g. `EMP-20260314-K7QX2M`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    use rand::seq::IndexedRandom;

    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| {
            ORDER_NUMBER_ALPHABET
                .choose(&mut rng)
                .map_or('X', |&b| char::from(b))
        })
        .collect();
    format!("EMP-{}-{suffix}", now.format("%Y%m%d"))
}

/// Checkout service.
pub struct CheckoutService<'a> {
    catalog: CatalogRepository<'a>,
    orders: OrderRepository<'a>,
    razorpay: &'a RazorpayClient,
    email: &'a EmailService,
    currency: Currency,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        razorpay: &'a RazorpayClient,
        email: &'a EmailService,
        currency: Currency,
    ) -> Self {
        Self {
            catalog: CatalogRepository::new(pool),
            orders: OrderRepository::new(pool),
            razorpay,
            email,
            currency,
        }
    }

    /// Price the cart, store a pending order and open a gateway order.
    ///
    /// If the gateway call fails the stored order is cancelled.
    ///
    /// # Errors
    ///
    /// See [`build_order_lines`]; additionally `CheckoutError::Gateway` when
    /// the gateway rejects the order.
    #[instrument(skip(self, items, address), fields(lines = items.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        items: &[CheckoutItem],
        address: ShippingAddress,
    ) -> Result<CheckoutSession, CheckoutError> {
        let address = address.validated().map_err(CheckoutError::Validation)?;

        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products = self.catalog.products_for_checkout(&ids).await?;
        let priced = build_order_lines(items, &products, self.currency)?;
        let amount = priced.subtotal.to_minor_units()?;
        if amount <= 0 {
            return Err(CheckoutError::Validation(
                "order total must be positive".to_owned(),
            ));
        }

        let shipping_address = serde_json::to_value(&address)
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;

        let mut attempt = 0;
        let (order_id, order_number) = loop {
            attempt += 1;
            let order = NewOrder {
                user_id,
                order_number: generate_order_number(Utc::now()),
                subtotal: priced.subtotal.amount,
                total: priced.subtotal.amount,
                currency: self.currency,
                shipping_address: shipping_address.clone(),
                items: priced.items.clone(),
            };
            match self.orders.create_with_items(&order).await {
                Ok(id) => break (id, order.order_number),
                Err(RepositoryError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {}
                Err(e) => return Err(e.into()),
            }
        };

        let gateway_order = match self
            .razorpay
            .create_order(amount, self.currency.code(), &order_number)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Gateway order creation failed");
                if let Err(cancel_err) = self.orders.cancel(order_id).await {
                    error!(order_id = %order_id, error = %cancel_err, "Failed to cancel order");
                }
                return Err(CheckoutError::Gateway(e));
            }
        };

        self.orders
            .attach_payment(
                order_id,
                &gateway_order.id,
                priced.subtotal.amount,
                self.currency,
            )
            .await?;

        info!(order_id = %order_id, order_number = %order_number, amount, "Order placed");

        Ok(CheckoutSession {
            order_id,
            order_number,
            gateway_order_id: gateway_order.id,
            amount,
            currency: self.currency,
            key_id: self.razorpay.key_id().to_owned(),
        })
    }

    /// Verify a browser checkout signature and finalize the payment.
    ///
    /// Verifying an already-paid payment succeeds without side effects.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` if the payment is not the caller's,
    /// `CheckoutError::InvalidSignature` on signature mismatch (the payment
    /// is marked failed).
    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    pub async fn confirm_payment(
        &self,
        user_id: UserId,
        confirmation: &PaymentConfirmation,
    ) -> Result<ConfirmedPayment, CheckoutError> {
        let payment = self
            .orders
            .get_payment_for_user(
                user_id,
                confirmation.order_id,
                &confirmation.gateway_order_id,
            )
            .await?
            .ok_or(CheckoutError::NotFound)?;

        if let Err(e) = self.razorpay.verify_payment_signature(
            &confirmation.gateway_order_id,
            &confirmation.gateway_payment_id,
            &confirmation.signature,
        ) {
            warn!(payment_id = %payment.id, "Payment signature mismatch");
            self.orders
                .mark_payment_failed(payment.id, Some(&confirmation.gateway_payment_id))
                .await?;
            return Err(e.into());
        }

        let outcome = self
            .orders
            .finalize_payment(
                payment.id,
                &confirmation.gateway_payment_id,
                Some(&confirmation.signature),
            )
            .await?;

        Ok(self.after_finalize(&outcome).await)
    }

    /// Handle a signed gateway webhook.
    ///
    /// Unknown events and unknown gateway orders are acknowledged and
    /// ignored so the gateway stops retrying them.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::WebhookDisabled` without a webhook secret,
    /// `CheckoutError::InvalidSignature` on mismatch and
    /// `CheckoutError::InvalidPayload` for unparseable bodies.
    #[instrument(skip_all)]
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<(), CheckoutError> {
        self.razorpay.verify_webhook_signature(body, signature)?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| CheckoutError::InvalidPayload(e.to_string()))?;

        let Some(entity) = event.payment() else {
            info!(event = %event.event, "Ignoring non-payment webhook");
            return Ok(());
        };
        let Some(gateway_order_id) = entity.order_id.as_deref() else {
            info!(event = %event.event, "Ignoring payment webhook without order");
            return Ok(());
        };
        let Some(payment) = self
            .orders
            .get_payment_by_gateway_order(gateway_order_id)
            .await?
        else {
            warn!(gateway_order_id, "Webhook for unknown gateway order");
            return Ok(());
        };

        match event.event.as_str() {
            "payment.captured" => {
                if !amount_matches(&payment, entity.amount)? {
                    warn!(payment_id = %payment.id, "Webhook amount does not match payment");
                    return Ok(());
                }
                let outcome = self
                    .orders
                    .finalize_payment(payment.id, &entity.id, None)
                    .await?;
                self.after_finalize(&outcome).await;
            }
            "payment.failed" => {
                if self
                    .orders
                    .mark_payment_failed(payment.id, Some(&entity.id))
                    .await?
                {
                    info!(payment_id = %payment.id, "Payment marked failed by webhook");
                }
            }
            other => info!(event = %other, "Ignoring webhook event"),
        }

        Ok(())
    }

    /// Log and notify after finalization. Email failures are logged only.
    async fn after_finalize(&self, outcome: &FinalizeOutcome) -> ConfirmedPayment {
        match outcome {
            FinalizeOutcome::AlreadyPaid { order_id } => {
                info!(order_id = %order_id, "Payment already finalized");
            }
            FinalizeOutcome::OrderNotPending { order_id, status } => {
                warn!(
                    order_id = %order_id,
                    status = %status,
                    "Payment captured for an order that is no longer pending"
                );
            }
            FinalizeOutcome::Paid { order_id, oversold } => {
                if !oversold.is_empty() {
                    warn!(order_id = %order_id, ?oversold, "Order oversold; stock clamped at zero");
                }
                info!(order_id = %order_id, "Order paid");

                match self.orders.get_with_owner_email(*order_id).await {
                    Ok((order, email)) => {
                        if let Err(e) = self.email.send_order_confirmation(&email, &order).await {
                            error!(order_id = %order_id, error = %e, "Failed to send order confirmation");
                        }
                    }
                    Err(e) => {
                        error!(order_id = %order_id, error = %e, "Failed to load order for confirmation");
                    }
                }
            }
        }

        confirmed_payment(outcome)
    }
}

/// Order state reported to the customer for a finalization outcome.
///
/// A repeated finalization reports `paid`; a payment that landed after the
/// order left `pending` reports the order's current status.
#[must_use]
pub const fn confirmed_payment(outcome: &FinalizeOutcome) -> ConfirmedPayment {
    match outcome {
        FinalizeOutcome::AlreadyPaid { order_id } | FinalizeOutcome::Paid { order_id, .. } => {
            ConfirmedPayment {
                order_id: *order_id,
                status: OrderStatus::Paid,
            }
        }
        FinalizeOutcome::OrderNotPending { order_id, status } => ConfirmedPayment {
            order_id: *order_id,
            status: *status,
        },
    }
}

/// Whether a webhook amount (minor units) matches the stored payment.
/// A webhook without an amount is accepted.
fn amount_matches(payment: &PaymentRecord, amount: Option<i64>) -> Result<bool, CheckoutError> {
    let Some(amount) = amount else {
        return Ok(true);
    };
    let expected = Money::new(payment.amount, payment.currency).to_minor_units()?;
    Ok(expected == amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use emporium_core::{PaymentId, PaymentStatus};

    use super::*;

    fn payment(amount: Decimal) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::generate(),
            order_id: OrderId::generate(),
            gateway_order_id: "order_Nx8kT2pQ4vZ1".to_owned(),
            amount,
            currency: Currency::INR,
            status: PaymentStatus::Created,
        }
    }

    fn product(price: i64, stock: i32) -> CheckoutProduct {
        CheckoutProduct {
            id: ProductId::generate(),
            name: "Walnut Tray".to_owned(),
            price: Decimal::new(price, 2),
            stock_qty: stock,
            is_active: true,
        }
    }

    fn item(product_id: ProductId, quantity: u32) -> CheckoutItem {
        CheckoutItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_prices_from_products() {
        let a = product(49_900, 10);
        let b = product(12_050, 10);
        let priced = build_order_lines(
            &[item(a.id, 2), item(b.id, 1)],
            &[a.clone(), b.clone()],
            Currency::INR,
        )
        .unwrap();

        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].line_total, Decimal::new(99_800, 2));
        assert_eq!(priced.subtotal.amount, Decimal::new(111_850, 2));
        assert_eq!(priced.subtotal.to_minor_units().unwrap(), 111_850);
    }

    #[test]
    fn test_merges_duplicate_lines() {
        let a = product(1_000, 10);
        let priced =
            build_order_lines(&[item(a.id, 2), item(a.id, 3)], &[a.clone()], Currency::INR)
                .unwrap();
        assert_eq!(priced.items.len(), 1);
        assert_eq!(priced.items[0].quantity, 5);
        assert_eq!(priced.subtotal.amount, Decimal::new(5_000, 2));
    }

    #[test]
    fn test_rejects_empty_and_zero_quantity() {
        let a = product(1_000, 10);
        assert!(matches!(
            build_order_lines(&[], &[a.clone()], Currency::INR),
            Err(CheckoutError::Validation(_))
        ));
        assert!(matches!(
            build_order_lines(&[item(a.id, 0)], &[a], Currency::INR),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_merged_quantity_over_limit() {
        let a = product(1_000, 1_000);
        let result = build_order_lines(&[item(a.id, 60), item(a.id, 41)], &[a], Currency::INR);
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_rejects_too_many_lines() {
        let products: Vec<_> = (0..=MAX_LINES).map(|_| product(100, 5)).collect();
        let items: Vec<_> = products.iter().map(|p| item(p.id, 1)).collect();
        assert!(matches!(
            build_order_lines(&items, &products, Currency::INR),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_and_inactive_products() {
        let mut a = product(1_000, 10);
        let missing = ProductId::generate();
        assert!(matches!(
            build_order_lines(&[item(missing, 1)], &[a.clone()], Currency::INR),
            Err(CheckoutError::ProductUnavailable(id)) if id == missing
        ));

        a.is_active = false;
        assert!(matches!(
            build_order_lines(&[item(a.id, 1)], &[a.clone()], Currency::INR),
            Err(CheckoutError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_rejects_insufficient_stock() {
        let a = product(1_000, 2);
        assert!(matches!(
            build_order_lines(&[item(a.id, 3)], &[a], Currency::INR),
            Err(CheckoutError::InsufficientStock { available: 2, .. })
        ));
    }

    #[test]
    fn test_order_number_format() {
        let now = DateTime::parse_from_rfc3339("2026-03-14T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_order_number(now);
        assert!(number.starts_with("EMP-20260314-"));
        let suffix = &number["EMP-20260314-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_gateway_errors_map_to_checkout_errors() {
        assert!(matches!(
            CheckoutError::from(RazorpayError::InvalidSignature),
            CheckoutError::InvalidSignature
        ));
        assert!(matches!(
            CheckoutError::from(RazorpayError::WebhookDisabled),
            CheckoutError::WebhookDisabled
        ));
    }

    #[test]
    fn test_webhook_amount_matches_in_minor_units() {
        let record = payment(Decimal::new(111_850, 2));
        assert!(amount_matches(&record, Some(111_850)).unwrap());
    }

    #[test]
    fn test_webhook_amount_mismatch() {
        let record = payment(Decimal::new(111_850, 2));
        assert!(!amount_matches(&record, Some(1_118)).unwrap());
        assert!(!amount_matches(&record, Some(0)).unwrap());
    }

    #[test]
    fn test_webhook_without_amount_is_accepted() {
        let record = payment(Decimal::new(50_000, 2));
        assert!(amount_matches(&record, None).unwrap());
    }

    #[test]
    fn test_fractional_stored_amount_is_an_error() {
        let record = payment(Decimal::new(10_005, 3));
        assert!(matches!(
            amount_matches(&record, Some(1_000)),
            Err(CheckoutError::Money(MoneyError::FractionalMinorUnits(_)))
        ));
    }

    #[test]
    fn test_confirmed_payment_for_fresh_payment() {
        let order_id = OrderId::generate();
        let confirmed = confirmed_payment(&FinalizeOutcome::Paid {
            order_id,
            oversold: vec![ProductId::generate()],
        });
        assert_eq!(confirmed.order_id, order_id);
        assert_eq!(confirmed.status, OrderStatus::Paid);
    }

    #[test]
    fn test_confirmed_payment_for_repeat_finalization() {
        let order_id = OrderId::generate();
        let confirmed = confirmed_payment(&FinalizeOutcome::AlreadyPaid { order_id });
        assert_eq!(confirmed.order_id, order_id);
        assert_eq!(confirmed.status, OrderStatus::Paid);
    }

    #[test]
    fn test_confirmed_payment_reports_current_status_when_not_pending() {
        let order_id = OrderId::generate();
        let confirmed = confirmed_payment(&FinalizeOutcome::OrderNotPending {
            order_id,
            status: OrderStatus::Cancelled,
        });
        assert_eq!(confirmed.order_id, order_id);
        assert_eq!(confirmed.status, OrderStatus::Cancelled);
    }
}
