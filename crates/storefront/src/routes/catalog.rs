//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::pagination::{PageQuery, Paginated};

use crate::db::CatalogRepository;
use crate::db::catalog::ProductFilter;
use crate::error::{AppError, Result};
use crate::models::{Category, ProductDetail, ProductSummary};
use crate::state::AppState;

/// `GET /api/products` filter parameters. Paging is read separately.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<bool>,
}

impl ProductListQuery {
    fn into_filter(self) -> ProductFilter {
        fn non_blank(s: Option<String>) -> Option<String> {
            s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        }

        ProductFilter {
            category: non_blank(self.category),
            q: non_blank(self.q),
            tag: non_blank(self.tag),
            featured: self.featured,
        }
    }
}

/// List categories.
///
/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

/// List active products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filters): Query<ProductListQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let (items, total) = CatalogRepository::new(state.pool())
        .list_products(&filters.into_filter(), &page)
        .await?;

    Ok(Json(Paginated::new(items, &page, total)))
}

/// Product detail.
///
/// GET /api/products/{slug}
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    CatalogRepository::new(state.pool())
        .get_product_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_dropped() {
        let filter = ProductListQuery {
            category: Some("  ".to_owned()),
            q: Some(" lamp ".to_owned()),
            tag: None,
            featured: Some(true),
        }
        .into_filter();

        assert_eq!(filter.category, None);
        assert_eq!(filter.q.as_deref(), Some("lamp"));
        assert_eq!(filter.featured, Some(true));
    }
}
