//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::debug;

use emporium_core::token::TokenKeys;

use crate::config::StorefrontConfig;
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::Category;
use crate::services::auth::AuthSettings;
use crate::services::email::EmailService;
use crate::services::razorpay::{RazorpayClient, RazorpayError};

/// How long the category list is served from memory.
const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(60);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("payment client error: {0}")]
    Razorpay(#[from] RazorpayError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    email: EmailService,
    razorpay: RazorpayClient,
    token_keys: TokenKeys,
    categories: Cache<(), Arc<Vec<Category>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(&config.email)?;
        let razorpay = RazorpayClient::new(&config.razorpay)?;
        let token_keys = TokenKeys::from_secret(config.jwt_secret.expose_secret().as_bytes());
        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATEGORY_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                razorpay,
                token_keys,
                categories,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Get a reference to the customer token keys.
    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        &self.inner.token_keys
    }

    /// Lifetimes for the OTP login flow.
    #[must_use]
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            otp_ttl: self.inner.config.otp_ttl,
            token_ttl: self.inner.config.token_ttl,
        }
    }

    /// All categories, served from a short-lived cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the list has to be reloaded and
    /// the query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(categories) = self.inner.categories.get(&()).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CatalogRepository::new(self.pool()).list_categories().await?);
        self.inner.categories.insert((), Arc::clone(&categories)).await;
        Ok(categories)
    }
}
