//! Catalog seeding from YAML.
//!
//! ```yaml
//! categories:
//!   - name: Kitchen
//!     slug: kitchen
//!     sort_order: 1
//! products:
//!   - name: Copper Kettle
//!     category: kitchen
//!     price: "49.00"
//!     stock_qty: 12
//!     tags: [copper, tea]
//! ```
//!
//! Categories and products are matched by slug, so re-running a file
//! updates rather than duplicates. The file is validated in full before
//! the database is touched.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{error, info};

use emporium_admin::db::CatalogRepository;
use emporium_admin::models::{CategoryInput, ProductInput};
use emporium_core::CategoryId;

use super::{CliError, connect};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<CategoryInput>,
    #[serde(default)]
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    /// Category slug; resolved against the file and then the database.
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    product: ProductInput,
}

/// A catalog file that passed validation.
#[derive(Debug)]
struct ValidCatalog {
    categories: Vec<CategoryInput>,
    products: Vec<(Option<String>, ProductInput)>,
}

/// Validate every entry, collecting all problems rather than stopping at
/// the first.
fn validate(file: CatalogFile) -> Result<ValidCatalog, Vec<String>> {
    let mut errors = Vec::new();
    let mut categories = Vec::with_capacity(file.categories.len());
    let mut products = Vec::with_capacity(file.products.len());

    for (i, category) in file.categories.into_iter().enumerate() {
        match category.validated() {
            Ok(c) => categories.push(c),
            Err(e) => errors.push(format!("categories[{i}]: {e}")),
        }
    }

    for (i, seed) in file.products.into_iter().enumerate() {
        let name = seed.product.name.clone();
        match seed.product.validated() {
            Ok(p) => products.push((seed.category, p)),
            Err(e) => errors.push(format!("products[{i}] ({name}): {e}")),
        }
    }

    let mut seen = HashMap::new();
    for (i, (_, product)) in products.iter().enumerate() {
        if let Some(first) = seen.insert(product.slug().to_owned(), i) {
            errors.push(format!(
                "products[{i}]: slug '{}' already used by products[{first}]",
                product.slug()
            ));
        }
    }

    if errors.is_empty() {
        Ok(ValidCatalog {
            categories,
            products,
        })
    } else {
        Err(errors)
    }
}

/// Upsert categories and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// names an unknown category, or a database write fails.
pub async fn catalog(file_path: &str) -> Result<(), CliError> {
    info!(path = %file_path, "Loading catalog");

    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let catalog = validate(file).map_err(|errors| {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        CliError::Validation(errors)
    })?;

    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Catalog validated"
    );

    let pool = connect().await?;
    let repo = CatalogRepository::new(&pool);

    for category in &catalog.categories {
        repo.upsert_category(category).await?;
    }

    let category_ids: HashMap<String, CategoryId> = repo
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.slug, c.id))
        .collect();

    let mut unknown = Vec::new();
    let mut upserted = 0usize;
    for (category, mut product) in catalog.products {
        if let Some(slug) = category {
            let Some(id) = category_ids.get(&slug) else {
                unknown.push(format!("{}: unknown category '{slug}'", product.slug()));
                continue;
            };
            product.category_id = Some(*id);
        }
        repo.upsert_product(&product).await?;
        upserted += 1;
    }

    info!(
        categories = catalog.categories.len(),
        products = upserted,
        "Seeding complete"
    );

    if unknown.is_empty() {
        Ok(())
    } else {
        for err in &unknown {
            error!("  - {err}");
        }
        Err(CliError::Validation(unknown))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Kitchen & Dining
    sort_order: 1
products:
  - name: Copper Kettle
    category: kitchen-dining
    price: "49.00"
    stock_qty: 12
    tags: [Copper, tea, copper]
  - name: Linen Apron
    price: "18.50"
"#;

    #[test]
    fn test_sample_file_validates() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let catalog = validate(file).unwrap();

        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.categories[0].slug(), "kitchen-dining");

        let (category, kettle) = &catalog.products[0];
        assert_eq!(category.as_deref(), Some("kitchen-dining"));
        assert_eq!(kettle.slug(), "copper-kettle");
        assert_eq!(kettle.tags, vec!["copper".to_string(), "tea".to_string()]);
        assert!(kettle.is_active);

        assert_eq!(catalog.products[1].0, None);
    }

    #[test]
    fn test_all_errors_are_reported() {
        let yaml = r#"
products:
  - name: Broken
    price: "-1"
  - name: Kettle
    price: "10"
  - name: Kettle
    price: "12"
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(file).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("price must not be negative"));
        assert!(errors[1].contains("slug 'kettle' already used"));
    }
}
