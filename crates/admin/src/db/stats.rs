//! Aggregate counters for the dashboard.

use sqlx::PgPool;

use emporium_core::OrderStatus;

use super::RepositoryError;
use crate::models::stats::{Revenue, StoreStats, status_counts};

/// Repository for dashboard aggregates.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute the dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(&self, low_stock_threshold: i32) -> Result<StoreStats, RepositoryError> {
        let (products, active_products, low_stock_products): (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE is_active),
                   COUNT(*) FILTER (WHERE is_active AND stock_qty <= $1)
            FROM products
            ",
        )
        .bind(low_stock_threshold)
        .fetch_one(self.pool)
        .await?;

        let by_status: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let paid: Vec<&str> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_paid())
            .map(|s| s.as_str())
            .collect();
        let revenue = sqlx::query_as::<_, Revenue>(
            r"
            SELECT currency, SUM(total) AS amount
            FROM orders
            WHERE status = ANY($1)
            GROUP BY currency
            ORDER BY currency
            ",
        )
        .bind(&paid)
        .fetch_all(self.pool)
        .await?;

        let unresolved_contact_messages: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE NOT is_resolved")
                .fetch_one(self.pool)
                .await?;

        Ok(StoreStats {
            products,
            active_products,
            low_stock_products,
            low_stock_threshold,
            orders_by_status: status_counts(&by_status),
            revenue,
            unresolved_contact_messages,
        })
    }
}
