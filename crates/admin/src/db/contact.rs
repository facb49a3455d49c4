//! Contact message inbox.

use sqlx::PgPool;

use emporium_core::ContactMessageId;
use emporium_core::pagination::PageQuery;

use super::RepositoryError;
use crate::models::ContactMessage;

/// Repository for `contact_messages`.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of messages, newest first, plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list(
        &self,
        resolved: Option<bool>,
        page: &PageQuery,
    ) -> Result<(Vec<ContactMessage>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, ContactMessage>(
            r"
            SELECT id, name, email, phone, subject, message, is_resolved, created_at
            FROM contact_messages
            WHERE ($1::bool IS NULL OR is_resolved = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(resolved)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contact_messages WHERE ($1::bool IS NULL OR is_resolved = $1)",
        )
        .bind(resolved)
        .fetch_one(self.pool)
        .await?;

        Ok((items, total))
    }

    /// Mark a message resolved or open again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_resolved(
        &self,
        id: ContactMessageId,
        resolved: bool,
    ) -> Result<ContactMessage, RepositoryError> {
        sqlx::query_as::<_, ContactMessage>(
            r"
            UPDATE contact_messages SET is_resolved = $2
            WHERE id = $1
            RETURNING id, name, email, phone, subject, message, is_resolved, created_at
            ",
        )
        .bind(id)
        .bind(resolved)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
