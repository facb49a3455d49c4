//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use emporium_core::token::TokenKeys;

use crate::config::AdminConfig;
use crate::services::auth::AuthSettings;
use crate::services::email::EmailService;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    email: EmailService,
    token_keys: TokenKeys,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(&config.email)?;
        let token_keys = TokenKeys::from_secret(config.jwt_secret.expose_secret().as_bytes());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                token_keys,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
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

    /// Get a reference to the admin token keys.
    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        &self.inner.token_keys
    }

    /// Lifetimes for the admin login flow.
    #[must_use]
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            otp_ttl: self.inner.config.otp_ttl,
            token_ttl: self.inner.config.token_ttl,
        }
    }
}
