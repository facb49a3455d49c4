//! Catalog read models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{CategoryId, ProductId, ProductImageId};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// A product as shown in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub in_stock: bool,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub category_slug: Option<String>,
    /// Primary image, falling back to the first by sort order.
    pub image_url: Option<String>,
}

/// A product image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub url: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

/// Full product detail page data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock_qty: i32,
    pub specs: serde_json::Value,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub category: Option<Category>,
    pub images: Vec<ProductImage>,
    pub updated_at: DateTime<Utc>,
}
