//! Read-only catalog queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use emporium_core::{CategoryId, ProductId};
use emporium_core::pagination::PageQuery;

use super::{RepositoryError, like_pattern};
use crate::models::{Category, ProductDetail, ProductImage, ProductSummary};

/// Optional listing filters; `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Category slug.
    pub category: Option<String>,
    /// Free-text match on name and description.
    pub q: Option<String>,
    /// Exact tag.
    pub tag: Option<String>,
    /// Featured flag.
    pub featured: Option<bool>,
}

/// Price and stock of a product, as needed to price an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock_qty: i32,
    pub is_active: bool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    stock_qty: i32,
    specs: serde_json::Value,
    tags: Vec<String>,
    is_featured: bool,
    category_id: Option<CategoryId>,
    updated_at: DateTime<Utc>,
}

const FILTER_CLAUSE: &str = r"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE p.is_active
      AND ($1::text IS NULL OR c.slug = $1)
      AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
      AND ($3::text IS NULL OR $3 = ANY(p.tags))
      AND ($4::bool IS NULL OR p.is_featured = $4)
";

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            r"
            SELECT id, slug, name, description, sort_order
            FROM categories
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// One page of active products plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: &PageQuery,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let q = filter.q.as_deref().map(like_pattern);

        let items = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT p.id, p.slug, p.name, p.price, p.compare_at_price,
                   p.stock_qty > 0 AS in_stock, p.is_featured, p.tags,
                   c.slug AS category_slug,
                   (SELECT i.url FROM product_images i
                    WHERE i.product_id = p.id
                    ORDER BY i.is_primary DESC, i.sort_order, i.id
                    LIMIT 1) AS image_url
            {FILTER_CLAUSE}
            ORDER BY p.is_featured DESC, p.created_at DESC, p.id
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(filter.category.as_deref())
        .bind(q.as_deref())
        .bind(filter.tag.as_deref())
        .bind(filter.featured)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FILTER_CLAUSE}"))
            .bind(filter.category.as_deref())
            .bind(q.as_deref())
            .bind(filter.tag.as_deref())
            .bind(filter.featured)
            .fetch_one(self.pool)
            .await?;

        Ok((items, total))
    }

    /// An active product with its images and category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, price, compare_at_price, stock_qty,
                   specs, tags, is_featured, category_id, updated_at
            FROM products
            WHERE slug = $1 AND is_active
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ProductImage>(
            r"
            SELECT id, url, alt_text, sort_order, is_primary
            FROM product_images
            WHERE product_id = $1
            ORDER BY is_primary DESC, sort_order, id
            ",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        let category = match row.category_id {
            Some(category_id) => {
                sqlx::query_as::<_, Category>(
                    "SELECT id, slug, name, description, sort_order FROM categories WHERE id = $1",
                )
                .bind(category_id)
                .fetch_optional(self.pool)
                .await?
            }
            None => None,
        };

        Ok(Some(ProductDetail {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            price: row.price,
            compare_at_price: row.compare_at_price,
            stock_qty: row.stock_qty,
            specs: row.specs,
            tags: row.tags,
            is_featured: row.is_featured,
            category,
            images,
            updated_at: row.updated_at,
        }))
    }

    /// Current price and stock for the given products. Missing IDs are
    /// simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_for_checkout(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CheckoutProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, CheckoutProduct>(
            "SELECT id, name, price, stock_qty, is_active FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
