//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError as DeliveryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] emporium_core::EmailError),

    /// Invalid phone format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] emporium_core::PhoneError),

    /// Other invalid input.
    #[error("{0}")]
    Validation(String),

    /// Code is wrong, already used, or no code was issued.
    #[error("invalid or expired code")]
    InvalidCode,

    /// Code was right but has expired.
    #[error("code expired")]
    CodeExpired,

    /// Too many codes requested recently.
    #[error("too many code requests, try again later")]
    TooManyRequests,

    /// The code email could not be sent.
    #[error("email delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] emporium_core::token::TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
