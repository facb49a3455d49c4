//! Dashboard counters.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{Currency, OrderStatus};

/// Revenue in one currency.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Revenue {
    pub currency: Currency,
    pub amount: Decimal,
}

/// Response of `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub products: i64,
    pub active_products: i64,
    /// Active products at or below [`StoreStats::low_stock_threshold`].
    pub low_stock_products: i64,
    pub low_stock_threshold: i32,
    /// Every status is present, zero when no order has it.
    pub orders_by_status: BTreeMap<&'static str, i64>,
    /// Totals of orders in a paid-or-later status, excluding refunds and
    /// cancellations.
    pub revenue: Vec<Revenue>,
    pub unresolved_contact_messages: i64,
}

/// Zero-filled status counts from `(status, count)` rows.
#[must_use]
pub fn status_counts(rows: &[(OrderStatus, i64)]) -> BTreeMap<&'static str, i64> {
    let mut counts: BTreeMap<&'static str, i64> =
        OrderStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for (status, count) in rows {
        *counts.entry(status.as_str()).or_insert(0) += count;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_zero_filled() {
        let counts = status_counts(&[(OrderStatus::Paid, 3), (OrderStatus::Shipped, 1)]);
        assert_eq!(counts.len(), OrderStatus::ALL.len());
        assert_eq!(counts["paid"], 3);
        assert_eq!(counts["shipped"], 1);
        assert_eq!(counts["pending"], 0);
        assert_eq!(counts["refunded"], 0);
    }
}
