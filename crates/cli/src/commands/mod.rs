//! Command implementations and the error type they share.

pub mod admin;
pub mod otp;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use emporium_admin::db::{self, RepositoryError};
use emporium_admin::services::auth::AuthError;

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Key hashing failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Admin user already exists.
    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    /// No admin user with this email.
    #[error("No admin user with email: {0}")]
    UnknownAdmin(String),

    /// Seed file could not be read.
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Seed file is not valid YAML for a catalog.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed file parsed but failed validation.
    #[error("{} catalog validation errors", .0.len())]
    Validation(Vec<String>),
}

/// Connect to the admin database.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    Ok(db::create_pool(&database_url).await?)
}
