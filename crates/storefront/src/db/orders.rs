//! Orders, order items and payments.
//!
//! Order totals arrive here already computed from database prices; this
//! module only persists them. Payment finalization is the one place that
//! needs row locking: the payment row is locked `FOR UPDATE` so concurrent
//! verify and webhook calls finalize it exactly once.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use emporium_core::pagination::PageQuery;
use emporium_core::{
    Currency, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{OrderDetail, OrderItem, OrderSummary, PaymentSummary};

/// A priced line ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A priced order ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub currency: Currency,
    pub shipping_address: serde_json::Value,
    pub items: Vec<NewOrderItem>,
}

/// The payment fields needed to verify a checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
}

/// Result of finalizing a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The payment had already been finalized; nothing changed.
    AlreadyPaid { order_id: OrderId },
    /// Payment and order marked paid, stock decremented. `oversold` lists
    /// products whose stock was short and got clamped at zero.
    Paid {
        order_id: OrderId,
        oversold: Vec<ProductId>,
    },
    /// Payment recorded as paid but the order had left `pending` (for
    /// example an admin cancelled it); stock is untouched.
    OrderNotPending {
        order_id: OrderId,
        status: OrderStatus,
    },
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    status: OrderStatus,
    subtotal: Decimal,
    total: Decimal,
    currency: Currency,
    shipping_address: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LockedPayment {
    order_id: OrderId,
    status: PaymentStatus,
}

/// Repository for checkout tables.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending order and its items in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on an order number collision.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn create_with_items(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order_id = OrderId::generate();

        sqlx::query(
            r"
            INSERT INTO orders (id, user_id, order_number, status, subtotal, total, currency,
                                shipping_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(order_id)
        .bind(order.user_id)
        .bind(&order.order_number)
        .bind(OrderStatus::Pending)
        .bind(order.subtotal)
        .bind(order.total)
        .bind(order.currency)
        .bind(&order.shipping_address)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "order number"))?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items (id, order_id, product_id, product_name, unit_price,
                                         quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(OrderItemId::generate())
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    /// Record the gateway order created for a checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the gateway order ID is reused.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn attach_payment(
        &self,
        order_id: OrderId,
        gateway_order_id: &str,
        amount: Decimal,
        currency: Currency,
    ) -> Result<PaymentId, RepositoryError> {
        let id = PaymentId::generate();
        sqlx::query(
            r"
            INSERT INTO payments (id, order_id, gateway_order_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(id)
        .bind(order_id)
        .bind(gateway_order_id)
        .bind(amount)
        .bind(currency)
        .bind(PaymentStatus::Created)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "gateway order"))?;

        Ok(id)
    }

    /// Cancel an order that is still pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
        )
        .bind(order_id)
        .bind(OrderStatus::Cancelled)
        .bind(OrderStatus::Pending)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// A page of a customer's orders, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: &PageQuery,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT o.id, o.order_number, o.status, o.total, o.currency,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count,
                   o.created_at
            FROM orders o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((items, total))
    }

    /// An order with items and its latest payment, if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, status, subtotal, total, currency, shipping_address,
                   created_at, updated_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_detail(row).await?)),
            None => Ok(None),
        }
    }

    /// An order by ID regardless of owner, with the owner's email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_owner_email(
        &self,
        order_id: OrderId,
    ) -> Result<(OrderDetail, String), RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, status, subtotal, total, currency, shipping_address,
                   created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let email: String = sqlx::query_scalar(
            "SELECT u.email FROM orders o JOIN users u ON u.id = o.user_id WHERE o.id = $1",
        )
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        Ok((self.load_detail(row).await?, email))
    }

    async fn load_detail(&self, row: OrderRow) -> Result<OrderDetail, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, product_id, product_name, unit_price, quantity, line_total
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_name, id
            ",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        let payment = sqlx::query_as::<_, PaymentSummary>(
            r"
            SELECT gateway_order_id, gateway_payment_id, amount, currency, status, updated_at
            FROM payments
            WHERE order_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(row.id)
        .fetch_optional(self.pool)
        .await?;

        Ok(OrderDetail {
            id: row.id,
            order_number: row.order_number,
            status: row.status,
            subtotal: row.subtotal,
            total: row.total,
            currency: row.currency,
            shipping_address: row.shipping_address,
            items,
            payment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// The payment for a gateway order, if it belongs to one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_payment_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRecord>(
            r"
            SELECT p.id, p.order_id, p.gateway_order_id, p.amount, p.currency, p.status
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE p.gateway_order_id = $1 AND p.order_id = $2 AND o.user_id = $3
            ",
        )
        .bind(gateway_order_id)
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// The payment for a gateway order ID (webhooks carry no user).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRecord>(
            r"
            SELECT id, order_id, gateway_order_id, amount, currency, status
            FROM payments
            WHERE gateway_order_id = $1
            ",
        )
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark a payment paid, its order paid, and decrement stock, atomically.
    ///
    /// Idempotent: a payment that is already paid yields
    /// [`FinalizeOutcome::AlreadyPaid`] and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment does not exist.
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn finalize_payment(
        &self,
        payment_id: PaymentId,
        gateway_payment_id: &str,
        signature: Option<&str>,
    ) -> Result<FinalizeOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, LockedPayment>(
            "SELECT order_id, status FROM payments WHERE id = $1 FOR UPDATE",
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if locked.status == PaymentStatus::Paid {
            tx.rollback().await?;
            return Ok(FinalizeOutcome::AlreadyPaid {
                order_id: locked.order_id,
            });
        }

        sqlx::query(
            r"
            UPDATE payments
            SET status = $2, gateway_payment_id = $3,
                gateway_signature = COALESCE($4, gateway_signature), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(payment_id)
        .bind(PaymentStatus::Paid)
        .bind(gateway_payment_id)
        .bind(signature)
        .execute(&mut *tx)
        .await?;

        let order_status: OrderStatus =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(locked.order_id)
                .fetch_one(&mut *tx)
                .await?;

        if order_status != OrderStatus::Pending {
            tx.commit().await?;
            return Ok(FinalizeOutcome::OrderNotPending {
                order_id: locked.order_id,
                status: order_status,
            });
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(locked.order_id)
            .bind(OrderStatus::Paid)
            .execute(&mut *tx)
            .await?;

        let oversold: Vec<ProductId> = sqlx::query_scalar(
            r"
            SELECT p.id
            FROM products p
            JOIN order_items i ON i.product_id = p.id
            WHERE i.order_id = $1 AND p.stock_qty < i.quantity
            FOR UPDATE OF p
            ",
        )
        .bind(locked.order_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE products p
            SET stock_qty = GREATEST(p.stock_qty - i.quantity, 0), updated_at = NOW()
            FROM order_items i
            WHERE i.order_id = $1 AND i.product_id = p.id
            ",
        )
        .bind(locked.order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(FinalizeOutcome::Paid {
            order_id: locked.order_id,
            oversold,
        })
    }

    /// Mark a payment failed unless it is already paid or failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_payment_failed(
        &self,
        payment_id: PaymentId,
        gateway_payment_id: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE payments
            SET status = $2, gateway_payment_id = COALESCE($3, gateway_payment_id),
                updated_at = NOW()
            WHERE id = $1 AND status = $4
            ",
        )
        .bind(payment_id)
        .bind(PaymentStatus::Failed)
        .bind(gateway_payment_id)
        .bind(PaymentStatus::Created)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
