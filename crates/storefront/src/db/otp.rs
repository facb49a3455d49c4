//! One-time code storage.
//!
//! Only digests are written (see `emporium_core::otp`). Issuing a new code
//! retires every older unused code for the user in the same transaction, so
//! at most one code is ever active.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::otp::OtpRecord;
use emporium_core::{OtpId, UserId};

use super::RepositoryError;

/// The active code for a user, as fetched for verification.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredOtp {
    pub id: OtpId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl StoredOtp {
    /// The fields the acceptance check needs.
    #[must_use]
    pub fn record(&self) -> OtpRecord {
        OtpRecord {
            code_digest: self.code.clone(),
            expires_at: self.expires_at,
            used: self.used,
        }
    }
}

/// Repository for `otp_codes`.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code digest, retiring any older unused codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn issue(
        &self,
        user_id: UserId,
        code_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE otp_codes SET used = true WHERE user_id = $1 AND used = false")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let id = OtpId::generate();
        sqlx::query(
            r"
            INSERT INTO otp_codes (id, user_id, code, expires_at, used)
            VALUES ($1, $2, $3, $4, false)
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(code_digest)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Most recently issued unused code for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_active(&self, user_id: UserId) -> Result<Option<StoredOtp>, RepositoryError> {
        let row = sqlx::query_as::<_, StoredOtp>(
            r"
            SELECT id, code, expires_at, used
            FROM otp_codes
            WHERE user_id = $1 AND used = false
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark a code used. Returns `false` when another request consumed it
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, id: OtpId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE otp_codes SET used = true WHERE id = $1 AND used = false")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of codes issued to a user since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_recent(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM otp_codes WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
