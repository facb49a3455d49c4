//! Catalog management types: read models and validated write inputs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{CategoryId, ProductId, ProductImageId, slug};

/// Longest accepted product or category name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Longest accepted image alt text.
pub const MAX_ALT_TEXT_LENGTH: usize = 200;

/// Most tags a product may carry.
pub const MAX_TAGS: usize = 20;

/// A category with the number of products assigned to it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A product row in the admin listing (inactive products included).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock_qty: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A product image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub url: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

/// Everything about one product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock_qty: i32,
    pub category_id: Option<CategoryId>,
    pub specs: serde_json::Value,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its images.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

/// Body of `POST /api/admin/products` and `PUT /api/admin/products/{id}`.
///
/// `PUT` is a full replacement: omitted optional fields are cleared.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock_qty: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "empty_object")]
    pub specs: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Normalize and check the input. The slug defaults to the slugified name.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the offending field.
    pub fn validated(mut self) -> Result<Self, String> {
        self.name = validated_name(&self.name)?;
        self.slug = Some(validated_slug(self.slug.as_deref(), &self.name)?);
        self.description = trimmed_optional(self.description);

        if self.price < Decimal::ZERO {
            return Err("price must not be negative".to_string());
        }
        if self.price.normalize().scale() > 2 {
            return Err("price must have at most 2 decimal places".to_string());
        }
        if let Some(compare_at) = self.compare_at_price
            && compare_at < self.price
        {
            return Err("compare_at_price must not be below price".to_string());
        }
        if self.stock_qty < 0 {
            return Err("stock_qty must not be negative".to_string());
        }
        if !self.specs.is_object() {
            return Err("specs must be a JSON object".to_string());
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.len() > MAX_TAGS {
            return Err(format!("at most {MAX_TAGS} tags are allowed"));
        }
        self.tags = tags;

        Ok(self)
    }

    /// The slug after validation.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}

/// Body of `POST /api/admin/categories` and `PUT /api/admin/categories/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryInput {
    /// Normalize and check the input. The slug defaults to the slugified name.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the offending field.
    pub fn validated(mut self) -> Result<Self, String> {
        self.name = validated_name(&self.name)?;
        self.slug = Some(validated_slug(self.slug.as_deref(), &self.name)?);
        self.description = trimmed_optional(self.description);
        Ok(self)
    }

    /// The slug after validation.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}

/// Body of `POST /api/admin/products/{id}/images`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_primary: bool,
}

impl ImageInput {
    /// Check the URL is absolute http(s) and trim the alt text.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the offending field.
    pub fn validated(mut self) -> Result<Self, String> {
        let url = url::Url::parse(self.url.trim()).map_err(|_| "url is not a valid URL")?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err("url must be an http or https URL".to_string());
        }
        self.url = url.to_string();

        self.alt_text = trimmed_optional(self.alt_text);
        if self
            .alt_text
            .as_ref()
            .is_some_and(|a| a.chars().count() > MAX_ALT_TEXT_LENGTH)
        {
            return Err(format!(
                "alt_text must be at most {MAX_ALT_TEXT_LENGTH} characters"
            ));
        }
        Ok(self)
    }
}

fn validated_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("name must be at most {MAX_NAME_LENGTH} characters"));
    }
    Ok(name.to_owned())
}

fn validated_slug(slug: Option<&str>, name: &str) -> Result<String, String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_owned(),
        None => slug::slugify(name),
    };
    if !slug::is_valid(&slug) {
        return Err(format!("invalid slug: {slug:?}"));
    }
    Ok(slug)
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "name": "  Oak Writing Desk ",
            "price": "12499.00",
            "tags": ["Wood", " wood ", "", "desk"]
        }))
        .unwrap()
    }

    #[test]
    fn test_product_defaults_and_normalization() {
        let input = product().validated().unwrap();
        assert_eq!(input.name, "Oak Writing Desk");
        assert_eq!(input.slug(), "oak-writing-desk");
        assert_eq!(input.tags, vec!["wood", "desk"]);
        assert!(input.is_active);
        assert!(!input.is_featured);
        assert_eq!(input.stock_qty, 0);
        assert!(input.specs.is_object());
    }

    #[test]
    fn test_product_rejects_bad_values() {
        let mut input = product();
        input.price = Decimal::from(-1);
        assert!(input.validated().is_err());

        let mut input = product();
        input.compare_at_price = Some(Decimal::from(100));
        assert_eq!(
            input.validated().unwrap_err(),
            "compare_at_price must not be below price"
        );

        let mut input = product();
        input.specs = serde_json::json!([1, 2]);
        assert!(input.validated().is_err());

        let mut input = product();
        input.slug = Some("Not A Slug".to_string());
        assert!(input.validated().is_err());

        let mut input = product();
        input.name = "   ".to_string();
        assert_eq!(input.validated().unwrap_err(), "name is required");
    }

    #[test]
    fn test_explicit_slug_is_kept() {
        let mut input = product();
        input.slug = Some(" oak-desk-2 ".to_string());
        assert_eq!(input.validated().unwrap().slug(), "oak-desk-2");
    }

    #[test]
    fn test_category_slug_from_name() {
        let input = CategoryInput {
            name: "Home Office".to_string(),
            slug: None,
            description: Some("  ".to_string()),
            sort_order: 2,
        }
        .validated()
        .unwrap();
        assert_eq!(input.slug(), "home-office");
        assert!(input.description.is_none());
    }

    #[test]
    fn test_image_url_scheme() {
        let image = |url: &str| ImageInput {
            url: url.to_string(),
            alt_text: None,
            sort_order: None,
            is_primary: false,
        };
        assert!(image("https://cdn.shop.test/desk.jpg").validated().is_ok());
        assert!(image("http://cdn.shop.test/desk.jpg").validated().is_ok());
        assert!(image("ftp://cdn.shop.test/desk.jpg").validated().is_err());
        assert!(image("javascript:alert(1)").validated().is_err());
        assert!(image("/relative/desk.jpg").validated().is_err());
    }
}
