//! Order management queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use emporium_core::pagination::PageQuery;
use emporium_core::{Currency, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{OrderCustomer, OrderDetail, OrderItem, OrderSummary, Payment};

const ORDER_FILTER: &str = r"
    FROM orders o
    JOIN users u ON u.id = o.user_id
    WHERE ($1::text IS NULL OR o.status = $1)
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    order_number: String,
    status: OrderStatus,
    subtotal: Decimal,
    total: Decimal,
    currency: Currency,
    shipping_address: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Result of a status change attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The order moved from `from` to the requested status.
    Changed { from: OrderStatus },
    /// The transition table does not allow `from` -> requested.
    NotAllowed { from: OrderStatus },
}

/// Repository for admin order queries.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders, newest first, plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: &PageQuery,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            SELECT o.id, o.order_number, o.status, o.total, o.currency,
                   u.email AS customer_email,
                   (SELECT COALESCE(SUM(i.quantity), 0)::bigint
                    FROM order_items i WHERE i.order_id = o.id) AS item_count,
                   o.created_at
            {ORDER_FILTER}
            ORDER BY o.created_at DESC, o.id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {ORDER_FILTER}"))
            .bind(status)
            .fetch_one(self.pool)
            .await?;

        Ok((items, total))
    }

    /// An order with its items, every payment attempt and the customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, order_number, status, subtotal, total, currency,
                   shipping_address, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let customer = sqlx::query_as::<_, OrderCustomer>(
            "SELECT id, email, full_name, phone FROM users WHERE id = $1",
        )
        .bind(order.user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order {id} has no customer row"))
        })?;

        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, product_id, product_name, unit_price, quantity, line_total
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_name, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let payments = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, gateway_order_id, gateway_payment_id, amount, currency, status,
                   created_at, updated_at
            FROM payments
            WHERE order_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            subtotal: order.subtotal,
            total: order.total,
            currency: order.currency,
            shipping_address: order.shipping_address,
            customer,
            items,
            payments,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }))
    }

    /// Move an order to `next` if the transition table allows it. The row is
    /// locked so two admins cannot race past the check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn set_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let from: OrderStatus =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !from.can_transition_to(next) {
            return Ok(StatusChange::NotAllowed { from });
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(StatusChange::Changed { from })
    }
}
