//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use emporium_core::OrderId;
use emporium_core::pagination::{PageQuery, Paginated};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::{OrderDetail, OrderSummary};
use crate::state::AppState;

/// The customer's orders, newest first.
///
/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let (items, total) = OrderRepository::new(state.pool())
        .list_for_user(customer.id, &page)
        .await?;

    Ok(Json(Paginated::new(items, &page, total)))
}

/// One of the customer's orders. Orders of other customers are reported
/// as not found.
///
/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get_for_user(customer.id, order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}
