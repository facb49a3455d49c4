//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Errors that can occur during admin authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown or inactive admin, malformed email, or wrong admin key.
    /// Deliberately indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Code is wrong, already used, or no code was issued.
    #[error("invalid or expired code")]
    InvalidCode,

    /// Code was right but has expired.
    #[error("code expired")]
    CodeExpired,

    /// Too many codes requested recently.
    #[error("too many code requests, try again later")]
    TooManyRequests,

    /// Argon2 hashing failed.
    #[error("failed to hash admin key")]
    KeyHash,

    /// The code email could not be sent.
    #[error("email delivery failed: {0}")]
    Delivery(#[from] EmailError),

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] emporium_core::token::TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
