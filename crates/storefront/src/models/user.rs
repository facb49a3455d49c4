//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{Email, UserId};

/// A storefront customer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email (normalized).
    pub email: Email,
    /// Contact phone, compact form.
    pub phone: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The authenticated customer, as carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCustomer {
    /// `users.id`.
    pub id: UserId,
    /// Email claim at login time.
    pub email: String,
}
