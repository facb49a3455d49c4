//! Category management route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use emporium_core::CategoryId;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Category, CategoryInput};
use crate::state::AppState;

/// GET /api/admin/categories
pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = CatalogRepository::new(state.pool())
        .list_categories()
        .await?;
    Ok(Json(categories))
}

/// POST /api/admin/categories
#[instrument(skip(state, admin, input), fields(admin = %admin.email))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = input.validated().map_err(AppError::BadRequest)?;
    let category = CatalogRepository::new(state.pool())
        .create_category(&input)
        .await?;

    info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/{id}
#[instrument(skip(state, admin, input), fields(admin = %admin.email))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let input = input.validated().map_err(AppError::BadRequest)?;
    let category = CatalogRepository::new(state.pool())
        .update_category(id, &input)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/admin/categories/{id}
///
/// Products in the category are kept and left uncategorized.
#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let detached = CatalogRepository::new(state.pool())
        .delete_category(id)
        .await?;

    info!(category_id = %id, detached, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
