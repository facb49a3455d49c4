//! Customer OTP authentication.
//!
//! `request_code` finds or creates the customer, retires older codes, stores
//! the digest of a fresh code and emails it. `verify_code` checks the latest
//! unused code, consumes it, and issues a customer bearer token.
//!
//! Emails registered in `admin_users` get no customer code. The caller sees
//! the usual generic answer.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use emporium_core::otp::{OtpCode, OtpError, OtpPurpose, expiry_from};
use emporium_core::token::{IssuedToken, TokenKeys};
use emporium_core::{Email, Phone, Role};

use crate::db::{OtpRepository, UserRepository};
use crate::models::User;
use crate::services::email::EmailService;

/// Codes a single user may request within [`RATE_WINDOW_MINUTES`].
pub const MAX_CODES_PER_WINDOW: i64 = 5;

/// Window for [`MAX_CODES_PER_WINDOW`].
pub const RATE_WINDOW_MINUTES: i64 = 15;

/// Longest accepted display name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Lifetimes used by the auth flow.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// How long an emailed code stays valid.
    pub otp_ttl: Duration,
    /// How long an issued customer token stays valid.
    pub token_ttl: Duration,
}

/// OTP authentication service.
pub struct OtpAuthService<'a> {
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    email: &'a EmailService,
    keys: &'a TokenKeys,
    settings: AuthSettings,
}

impl<'a> OtpAuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        email: &'a EmailService,
        keys: &'a TokenKeys,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            email,
            keys,
            settings,
        }
    }

    /// Issue and email a login code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidPhone` or
    /// `AuthError::Validation` for bad input, `AuthError::TooManyRequests`
    /// when the per-user limit is hit, and `AuthError::Delivery` if the
    /// email cannot be sent.
    #[instrument(skip(self, full_name, phone))]
    pub async fn request_code(
        &self,
        email: &str,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let full_name = normalize_name(full_name)?;
        let phone = phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Phone::parse)
            .transpose()?;

        // Admin emails share `otp_codes` with customers; issuing here would
        // retire the admin's pending code and spend their request budget.
        if self.users.is_admin_email(&email).await? {
            warn!("Customer code requested for an admin email");
            return Ok(());
        }

        let user = self
            .users
            .find_or_create(&email, full_name.as_deref(), phone.as_ref())
            .await?;

        let now = Utc::now();
        let recent = self
            .otps
            .count_recent(user.id, now - Duration::minutes(RATE_WINDOW_MINUTES))
            .await?;
        if recent >= MAX_CODES_PER_WINDOW {
            warn!(user_id = %user.id, recent, "OTP request limit reached");
            return Err(AuthError::TooManyRequests);
        }

        let code = OtpCode::generate();
        self.otps
            .issue(
                user.id,
                &code.digest_for(OtpPurpose::Customer),
                expiry_from(now, self.settings.otp_ttl),
            )
            .await?;

        self.email
            .send_otp_code(
                email.as_str(),
                code.as_str(),
                self.settings.otp_ttl.num_minutes(),
            )
            .await?;

        info!(user_id = %user.id, "Login code issued");
        Ok(())
    }

    /// Check a code and, if it is valid, consume it and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for an unknown user, missing, used or
    /// wrong code (indistinguishable to the caller) and
    /// `AuthError::CodeExpired` for an expired one.
    #[instrument(skip(self, code))]
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<(IssuedToken, User), AuthError> {
        let email = Email::parse(email)?;
        let candidate = OtpCode::parse(code).map_err(|_| AuthError::InvalidCode)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        let stored = self
            .otps
            .latest_active(user.id)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        stored
            .record()
            .check_for(&candidate, OtpPurpose::Customer, Utc::now())
            .map_err(|e| match e {
                OtpError::Expired => AuthError::CodeExpired,
                _ => AuthError::InvalidCode,
            })?;

        if !self.otps.consume(stored.id).await? {
            // Lost a race with a concurrent verify of the same code.
            return Err(AuthError::InvalidCode);
        }

        let token = self.keys.issue(
            user.id.as_uuid(),
            user.email.as_str(),
            Role::Customer,
            self.settings.token_ttl,
        )?;

        info!(user_id = %user.id, "Customer logged in");
        Ok((token, user))
    }
}

/// Trim a display name; blank means absent.
///
/// # Errors
///
/// Returns `AuthError::Validation` if the name is too long.
pub fn normalize_name(name: Option<&str>) -> Result<Option<String>, AuthError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::Validation(format!(
            "full_name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(Some(name.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(None).unwrap(), None);
        assert_eq!(normalize_name(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_name(Some("  Asha Rao ")).unwrap().as_deref(),
            Some("Asha Rao")
        );
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            normalize_name(Some(&long)),
            Err(AuthError::Validation(_))
        ));
    }
}
