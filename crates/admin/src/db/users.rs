//! The `users` rows behind admin logins.

use sqlx::PgPool;

use emporium_core::{Email, UserId};

use super::RepositoryError;

/// Repository for the shared `users` table.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// ID of the user with this email, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_by_email(&self, email: &Email) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// ID of the user with this email, creating a bare user row if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_or_create(&self, email: &Email) -> Result<UserId, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let id = sqlx::query_scalar::<_, UserId>(
            r"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id
            ",
        )
        .bind(UserId::generate())
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}
