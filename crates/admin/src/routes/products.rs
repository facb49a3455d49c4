//! Product management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use emporium_core::pagination::{PageQuery, Paginated};
use emporium_core::{CategoryId, ProductId, ProductImageId};

use crate::db::CatalogRepository;
use crate::db::catalog::ProductFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{ImageInput, Product, ProductDetail, ProductImage, ProductInput, ProductSummary};
use crate::state::AppState;

/// `GET /api/admin/products` filter parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub q: Option<String>,
    pub category_id: Option<CategoryId>,
    pub active: Option<bool>,
}

impl ProductListQuery {
    fn into_filter(self) -> ProductFilter {
        ProductFilter {
            q: self
                .q
                .map(|q| q.trim().to_owned())
                .filter(|q| !q.is_empty()),
            category_id: self.category_id,
            active: self.active,
        }
    }
}

/// `PATCH /api/admin/products/{id}/stock` body.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock_qty: i32,
}

/// List products, inactive ones included.
///
/// GET /api/admin/products
#[instrument(skip(state, _admin))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filters): Query<ProductListQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let (items, total) = CatalogRepository::new(state.pool())
        .list_products(&filters.into_filter(), &page)
        .await?;

    Ok(Json(Paginated::new(items, &page, total)))
}

/// Create a product.
///
/// POST /api/admin/products
#[instrument(skip(state, admin, input), fields(admin = %admin.email))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<ProductDetail>)> {
    let input = input.validated().map_err(AppError::BadRequest)?;
    let product = CatalogRepository::new(state.pool())
        .create_product(&input)
        .await?;

    info!(product_id = %product.product.id, slug = %product.product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Product with its images.
///
/// GET /api/admin/products/{id}
#[instrument(skip(state, _admin))]
pub async fn get_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    CatalogRepository::new(state.pool())
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Replace every editable field of a product.
///
/// PUT /api/admin/products/{id}
#[instrument(skip(state, admin, input), fields(admin = %admin.email))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductDetail>> {
    let input = input.validated().map_err(AppError::BadRequest)?;
    let product = CatalogRepository::new(state.pool())
        .update_product(id, &input)
        .await?;

    info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Set the stock level.
///
/// PATCH /api/admin/products/{id}/stock
#[instrument(skip(state, admin, body), fields(admin = %admin.email, stock_qty = body.stock_qty))]
pub async fn update_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockUpdate>,
) -> Result<Json<Product>> {
    if body.stock_qty < 0 {
        return Err(AppError::BadRequest(
            "stock_qty must not be negative".to_string(),
        ));
    }

    let product = CatalogRepository::new(state.pool())
        .set_stock(id, body.stock_qty)
        .await?;

    info!(product_id = %id, "Stock updated");
    Ok(Json(product))
}

/// Delete a product that was never ordered.
///
/// DELETE /api/admin/products/{id}
#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    CatalogRepository::new(state.pool())
        .delete_product(id)
        .await?;

    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Attach an image.
///
/// POST /api/admin/products/{id}/images
#[instrument(skip(state, admin, input), fields(admin = %admin.email))]
pub async fn add_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ImageInput>,
) -> Result<(StatusCode, Json<ProductImage>)> {
    let input = input.validated().map_err(AppError::BadRequest)?;
    let image = CatalogRepository::new(state.pool())
        .add_image(id, &input)
        .await?;

    Ok((StatusCode::CREATED, Json(image)))
}

/// Remove an image.
///
/// DELETE /api/admin/products/{id}/images/{image_id}
#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<StatusCode> {
    CatalogRepository::new(state.pool())
        .delete_image(id, image_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_search_is_dropped() {
        let filter = ProductListQuery {
            q: Some("   ".to_string()),
            category_id: None,
            active: Some(false),
        }
        .into_filter();
        assert_eq!(filter.q, None);
        assert_eq!(filter.active, Some(false));
    }

    #[test]
    fn test_search_is_trimmed() {
        let filter = ProductListQuery {
            q: Some(" kettle ".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.q.as_deref(), Some("kettle"));
    }
}
