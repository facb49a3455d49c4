//! Database operations for the admin API.
//!
//! # Tables
//!
//! - `admin_users` - Who may log in to the admin API (Argon2 key hashes)
//! - `users`, `otp_codes` - Shared with the storefront; admins log in with
//!   the same one-time code flow
//! - `categories`, `products`, `product_images` - Catalog management
//! - `orders`, `order_items`, `payments` - Order management
//! - `contact_messages` - Contact form inbox
//!
//! The schema is managed outside this repository. The CLI reuses these
//! repositories for admin management, catalog seeding and OTP cleanup.

pub mod admin_users;
pub mod catalog;
pub mod contact;
pub mod orders;
pub mod otp;
pub mod stats;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use catalog::CatalogRepository;
pub use contact::ContactRepository;
pub use orders::OrderRepository;
pub use otp::OtpRepository;
pub use stats::StatsRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug, product still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict` with a readable
    /// message, everything else to `Database`.
    ///
    /// `what` names the thing being written, `referenced` what a foreign key
    /// failure means for this statement.
    pub(crate) fn from_write(err: sqlx::Error, what: &str, referenced: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(referenced.to_string());
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Escape `%`, `_` and `\` so user input is matched literally by `ILIKE`.
#[must_use]
pub fn like_pattern(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("oak"), "%oak%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
    }
}
