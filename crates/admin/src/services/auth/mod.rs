//! Admin OTP authentication.
//!
//! Admins prove who they are twice: the admin key (issued by `emp-cli`,
//! stored as an Argon2 hash) gates code issuance, and the emailed one-time
//! code gates the token. Every first-step failure looks the same to the
//! caller.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use emporium_core::otp::{OtpCode, OtpError, OtpPurpose, OtpRecord, expiry_from};
use emporium_core::token::{IssuedToken, TokenKeys};
use emporium_core::{Email, Role};

use crate::db::{AdminUserRepository, OtpRepository, UserRepository};
use crate::models::AdminUser;
use crate::services::email::EmailService;

/// Length of a generated admin key.
pub const ADMIN_KEY_LENGTH: usize = 40;

/// Codes a single admin may request within [`RATE_WINDOW_MINUTES`].
pub const MAX_CODES_PER_WINDOW: i64 = 5;

/// Window for [`MAX_CODES_PER_WINDOW`].
pub const RATE_WINDOW_MINUTES: i64 = 15;

/// Lifetimes used by the auth flow.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// How long an emailed code stays valid.
    pub otp_ttl: Duration,
    /// How long an issued admin token stays valid.
    pub token_ttl: Duration,
}

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    admins: AdminUserRepository<'a>,
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    email: &'a EmailService,
    keys: &'a TokenKeys,
    settings: AuthSettings,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        email: &'a EmailService,
        keys: &'a TokenKeys,
        settings: AuthSettings,
    ) -> Self {
        Self {
            admins: AdminUserRepository::new(pool),
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            email,
            keys,
            settings,
        }
    }

    /// Check the admin key and email a login code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for any identity failure,
    /// `AuthError::TooManyRequests` when the per-admin limit is hit, and
    /// `AuthError::Delivery` if the email cannot be sent.
    #[instrument(skip(self, admin_key))]
    pub async fn request_code(&self, email: &str, admin_key: &str) -> Result<(), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((admin, key_hash)) = self.admins.get_with_key_hash(&email).await? else {
            warn!("Admin login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !admin.is_active {
            warn!(admin_id = %admin.id, "Login attempt for inactive admin");
            return Err(AuthError::InvalidCredentials);
        }
        if !verify_admin_key(admin_key, &key_hash) {
            warn!(admin_id = %admin.id, "Admin key mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let user_id = self.users.find_or_create(&email).await?;

        let now = Utc::now();
        let recent = self
            .otps
            .count_recent(user_id, now - Duration::minutes(RATE_WINDOW_MINUTES))
            .await?;
        if recent >= MAX_CODES_PER_WINDOW {
            warn!(admin_id = %admin.id, recent, "Admin OTP request limit reached");
            return Err(AuthError::TooManyRequests);
        }

        let code = OtpCode::generate();
        self.otps
            .issue(
                user_id,
                &code.digest_for(OtpPurpose::Admin),
                expiry_from(now, self.settings.otp_ttl),
            )
            .await?;

        self.email
            .send_login_code(
                email.as_str(),
                code.as_str(),
                self.settings.otp_ttl.num_minutes(),
            )
            .await?;

        info!(admin_id = %admin.id, "Admin login code issued");
        Ok(())
    }

    /// Check a code and, if valid, consume it and issue an admin token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for an unknown or inactive admin and
    /// a missing, used or wrong code; `AuthError::CodeExpired` for an
    /// expired one.
    #[instrument(skip(self, code))]
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<(IssuedToken, AdminUser), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCode)?;
        let candidate = OtpCode::parse(code).map_err(|_| AuthError::InvalidCode)?;

        // Deactivation between the two steps must still block the login.
        let admin = self
            .admins
            .get_by_email(&email)
            .await?
            .filter(|a| a.is_active)
            .ok_or(AuthError::InvalidCode)?;

        let user_id = self
            .users
            .id_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        let stored = self
            .otps
            .latest_active(user_id)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        OtpRecord::from(&stored)
            .check_for(&candidate, OtpPurpose::Admin, Utc::now())
            .map_err(|e| match e {
                OtpError::Expired => AuthError::CodeExpired,
                _ => AuthError::InvalidCode,
            })?;

        if !self.otps.consume(stored.id).await? {
            return Err(AuthError::InvalidCode);
        }

        self.admins.record_login(admin.id).await?;

        let token = self.keys.issue(
            user_id.as_uuid(),
            email.as_str(),
            Role::Admin,
            self.settings.token_ttl,
        )?;

        info!(admin_id = %admin.id, "Admin logged in");
        Ok((token, admin))
    }
}

/// A fresh random alphanumeric admin key.
#[must_use]
pub fn generate_admin_key() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ADMIN_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash an admin key using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::KeyHash` if hashing fails.
pub fn hash_admin_key(key: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::KeyHash)
}

/// Whether `key` matches a stored Argon2 hash. A malformed hash never
/// matches.
#[must_use]
pub fn verify_admin_key(key: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(key.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_admin_key();
        assert_eq!(key.len(), ADMIN_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(key, generate_admin_key());
    }

    #[test]
    fn test_hash_and_verify() {
        let key = generate_admin_key();
        let hash = hash_admin_key(&key).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_admin_key(&key, &hash));
        assert!(!verify_admin_key("not-the-key", &hash));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_admin_key("anything", "plaintext-key"));
        assert!(!verify_admin_key("", ""));
    }
}
