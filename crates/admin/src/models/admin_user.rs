//! Admin user domain types.
//!
//! An admin is a row in `admin_users` plus a matching `users` row (found or
//! created at login) whose ID becomes the token subject.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{AdminUserId, Email, UserId};

/// An admin user (domain type). The key hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
    /// Deactivated admins cannot log in.
    pub is_active: bool,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// Last successful OTP login.
    pub last_login_at: Option<DateTime<Utc>>,
}

/// The authenticated admin, as carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAdmin {
    /// `users.id` of the admin's user row.
    pub user_id: UserId,
    /// Email claim at login time.
    pub email: String,
}
