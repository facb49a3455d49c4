//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use emporium_core::pagination::{PageQuery, Paginated};
use emporium_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::db::orders::StatusChange;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{OrderDetail, OrderSummary, StatusUpdate};
use crate::state::AppState;

/// `GET /api/admin/orders` filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// List orders, newest first.
///
/// GET /api/admin/orders
#[instrument(skip(state, _admin))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<OrderListQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let (items, total) = OrderRepository::new(state.pool())
        .list(filter.status, &page)
        .await?;

    Ok(Json(Paginated::new(items, &page, total)))
}

/// Order with items, payments and customer.
///
/// GET /api/admin/orders/{id}
#[instrument(skip(state, _admin))]
pub async fn get_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Move an order along the status graph.
///
/// PATCH /api/admin/orders/{id}/status
#[instrument(skip(state, admin, body), fields(admin = %admin.email, status = %body.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    let orders = OrderRepository::new(state.pool());

    match orders.set_status(id, body.status).await? {
        StatusChange::Changed { from } => {
            info!(order_id = %id, %from, to = %body.status, "Order status changed");
        }
        StatusChange::NotAllowed { from } => {
            warn!(order_id = %id, %from, to = %body.status, "Rejected order status change");
            return Err(AppError::Conflict(format!(
                "cannot change order status from {from} to {}",
                body.status
            )));
        }
    }

    orders
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}
