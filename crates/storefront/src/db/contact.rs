//! Contact form submissions.

use sqlx::PgPool;

use emporium_core::{ContactMessageId, Email, Phone};

use super::RepositoryError;

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

    /// Store a submitted message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        name: &str,
        email: &Email,
        phone: Option<&Phone>,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessageId, RepositoryError> {
        let id = ContactMessageId::generate();
        sqlx::query(
            r"
            INSERT INTO contact_messages (id, name, email, phone, subject, message, is_resolved)
            VALUES ($1, $2, $3, $4, $5, $6, false)
            ",
        )
        .bind(id)
        .bind(name)
        .bind(email.as_str())
        .bind(phone.map(Phone::as_str))
        .bind(subject)
        .bind(message)
        .execute(self.pool)
        .await?;

        Ok(id)
    }
}
