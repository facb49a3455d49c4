//! Contact message route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::ContactMessageId;
use emporium_core::pagination::{PageQuery, Paginated};

use crate::db::ContactRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ContactMessage;
use crate::state::AppState;

/// `GET /api/admin/contact-messages` filter.
#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    pub resolved: Option<bool>,
}

/// `PATCH /api/admin/contact-messages/{id}` body.
#[derive(Debug, Deserialize)]
pub struct ResolvedUpdate {
    pub is_resolved: bool,
}

/// GET /api/admin/contact-messages
#[instrument(skip(state, _admin))]
pub async fn list_messages(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<ContactListQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ContactMessage>>> {
    let (items, total) = ContactRepository::new(state.pool())
        .list(filter.resolved, &page)
        .await?;

    Ok(Json(Paginated::new(items, &page, total)))
}

/// PATCH /api/admin/contact-messages/{id}
#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn update_message(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ContactMessageId>,
    Json(body): Json<ResolvedUpdate>,
) -> Result<Json<ContactMessage>> {
    let message = ContactRepository::new(state.pool())
        .set_resolved(id, body.is_resolved)
        .await?;
    Ok(Json(message))
}
