//! Admin user repository for database operations.
//!
//! The key hash is only ever read by [`AdminUserRepository::get_with_key_hash`]
//! for login; every other query returns [`AdminUser`] without it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::{AdminUserId, Email};

use super::RepositoryError;
use crate::models::admin_user::AdminUser;

const ADMIN_COLUMNS: &str = "id, email, is_active, created_at, last_login_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: AdminUserId,
    email: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdminKeyRow {
    #[sqlx(flatten)]
    admin: AdminUserRow,
    admin_key: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an admin user together with the stored Argon2 key hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_with_key_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminKeyRow>(&format!(
            "SELECT {ADMIN_COLUMNS}, admin_key FROM admin_users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((AdminUser::try_from(r.admin)?, r.admin_key)))
            .transpose()
    }

    /// List all admin users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create an active admin with the given key hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already an admin.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, email: &Email, key_hash: &str) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            INSERT INTO admin_users (id, email, admin_key, is_active)
            VALUES ($1, $2, $3, true)
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(AdminUserId::generate())
        .bind(email.as_str())
        .bind(key_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "admin user", "admin user is referenced"))?;

        row.try_into()
    }

    /// Replace an admin's key hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no admin has this email.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_key_hash(&self, email: &Email, key_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE admin_users SET admin_key = $2 WHERE email = $1")
            .bind(email.as_str())
            .bind(key_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Activate or deactivate an admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no admin has this email.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_active(&self, email: &Email, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE admin_users SET is_active = $2 WHERE email = $1")
            .bind(email.as_str())
            .bind(active)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_login(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin_users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
