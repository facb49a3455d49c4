//! Catalog management: categories, products and product images.

use sqlx::{PgPool, Postgres, Transaction};

use emporium_core::pagination::PageQuery;
use emporium_core::{CategoryId, ProductId, ProductImageId};

use super::{RepositoryError, like_pattern};
use crate::models::{
    Category, CategoryInput, ImageInput, Product, ProductDetail, ProductImage, ProductInput,
    ProductSummary,
};

const PRODUCT_COLUMNS: &str = "id, slug, name, description, price, compare_at_price, stock_qty, \
     category_id, specs, tags, is_active, is_featured, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, product_id, url, alt_text, sort_order, is_primary";

const PRODUCT_FILTER: &str = r"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.slug ILIKE $1)
      AND ($2::uuid IS NULL OR p.category_id = $2)
      AND ($3::bool IS NULL OR p.is_active = $3)
";

const CATEGORY_SELECT: &str = r"
    SELECT c.id, c.slug, c.name, c.description, c.sort_order, c.created_at,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count
    FROM categories c
";

/// Admin product listing filters; `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Match on name or slug.
    pub q: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Only active (`true`) or only inactive (`false`) products.
    pub active: Option<bool>,
}

/// Repository for catalog writes and admin reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories in display order, with product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "{CATEGORY_SELECT} ORDER BY c.sort_order, c.name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// One category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row)
    }

    /// Create a category from validated input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO categories (id, slug, name, description, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(CategoryId::generate())
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category slug", "category is referenced"))?;

        self.get_category(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE categories
            SET slug = $2, name = $3, description = $4, sort_order = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.sort_order)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category slug", "category is referenced"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_category(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category, detaching its products first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn delete_category(&self, id: CategoryId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query(
            "UPDATE products SET category_id = NULL, updated_at = NOW() WHERE category_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Nothing to commit; dropping the transaction rolls it back.
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(detached)
    }

    /// Insert or update a category by slug. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(&self, input: &CategoryInput) -> Result<CategoryId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO categories (id, slug, name, description, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                sort_order = EXCLUDED.sort_order
            RETURNING id
            ",
        )
        .bind(CategoryId::generate())
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products (active or not) plus the total matching count.
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
            SELECT p.id, p.slug, p.name, p.price, p.compare_at_price, p.stock_qty,
                   p.is_active, p.is_featured, p.category_id,
                   c.name AS category_name, p.updated_at
            {PRODUCT_FILTER}
            ORDER BY p.updated_at DESC, p.id
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(q.as_deref())
        .bind(filter.category_id)
        .bind(filter.active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {PRODUCT_FILTER}"))
            .bind(q.as_deref())
            .bind(filter.category_id)
            .bind(filter.active)
            .fetch_one(self.pool)
            .await?;

        Ok((items, total))
    }

    /// A product with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            SELECT {IMAGE_COLUMNS}
            FROM product_images
            WHERE product_id = $1
            ORDER BY is_primary DESC, sort_order, id
            "
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ProductDetail { product, images }))
    }

    /// Create a product from validated input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_product(&self, input: &ProductInput) -> Result<ProductDetail, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO products (
                id, slug, name, description, price, compare_at_price, stock_qty,
                category_id, specs, tags, is_active, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(ProductId::generate())
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock_qty)
        .bind(input.category_id)
        .bind(&input.specs)
        .bind(&input.tags)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product slug", "category does not exist"))?;

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category doesn't exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<ProductDetail, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET slug = $2, name = $3, description = $4, price = $5,
                compare_at_price = $6, stock_qty = $7, category_id = $8,
                specs = $9, tags = $10, is_active = $11, is_featured = $12,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock_qty)
        .bind(input.category_id)
        .bind(&input.specs)
        .bind(&input.tags)
        .bind(input.is_active)
        .bind(input.is_featured)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product slug", "category does not exist"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Set the stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_stock(&self, id: ProductId, stock_qty: i32) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET stock_qty = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(stock_qty)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row)
    }

    /// Delete a product and its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if orders reference the product.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let referenced = "product has orders; deactivate it instead";
        let mut tx = self.pool.begin().await?;

        let ordered: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if ordered {
            return Err(RepositoryError::Conflict(referenced.to_string()));
        }

        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // The FK still guards against an order placed since the check above.
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product", referenced))?
            .rows_affected();
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or update a product by slug. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert_product(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO products (
                id, slug, name, description, price, compare_at_price, stock_qty,
                category_id, specs, tags, is_active, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                compare_at_price = EXCLUDED.compare_at_price,
                stock_qty = EXCLUDED.stock_qty,
                category_id = EXCLUDED.category_id,
                specs = EXCLUDED.specs,
                tags = EXCLUDED.tags,
                is_active = EXCLUDED.is_active,
                is_featured = EXCLUDED.is_featured,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(ProductId::generate())
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock_qty)
        .bind(input.category_id)
        .bind(&input.specs)
        .bind(&input.tags)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product slug", "category does not exist"))?;

        Ok(id)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Attach an image. A primary image clears the flag on the others; the
    /// first image of a product is always primary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        input: &ImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, product_id).await?;

        let (count, next_sort): (i64, i32) = sqlx::query_as(
            r"
            SELECT COUNT(*), COALESCE(MAX(sort_order) + 1, 0)
            FROM product_images
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_primary = input.is_primary || count == 0;
        if is_primary {
            sqlx::query("UPDATE product_images SET is_primary = false WHERE product_id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO product_images (id, product_id, url, alt_text, sort_order, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(ProductImageId::generate())
        .bind(product_id)
        .bind(&input.url)
        .bind(input.alt_text.as_deref())
        .bind(input.sort_order.unwrap_or(next_sort))
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await?;

        touch_product(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(image)
    }

    /// Remove an image. If it was primary, the next image by sort order is
    /// promoted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't belong to the
    /// product.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, product_id).await?;

        let was_primary: bool = sqlx::query_scalar(
            "DELETE FROM product_images WHERE id = $1 AND product_id = $2 RETURNING is_primary",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_primary {
            sqlx::query(
                r"
                UPDATE product_images SET is_primary = true
                WHERE id = (
                    SELECT id FROM product_images
                    WHERE product_id = $1
                    ORDER BY sort_order, id
                    LIMIT 1
                )
                ",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        touch_product(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Lock the product row so concurrent image edits serialize.
async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, ProductId>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(())
}

async fn touch_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE products SET updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
