//! Order management read models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{
    Currency, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId,
};

/// An order in the admin listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: Currency,
    pub customer_email: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A line item.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A payment attempt. Admins see every attempt, not just the latest.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The customer who placed an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderCustomer {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Full order view for the admin.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub currency: Currency,
    pub shipping_address: serde_json::Value,
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PATCH /api/admin/orders/{id}/status`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
