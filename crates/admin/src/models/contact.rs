//! Contact form inbox.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::ContactMessageId;

/// A stored contact form submission.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}
