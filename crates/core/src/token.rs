//! Bearer tokens issued after a successful OTP login.
//!
//! Tokens are HS256 JWTs. Each binary signs with its own secret, so a
//! storefront token never verifies against the admin API and vice versa; the
//! `role` claim is checked on top of that.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::Role;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encode(jsonwebtoken::errors::Error),
    /// Token is malformed, expired, or signed with another key.
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// `users.id` of the subject (admins also have a `users` row).
    pub sub: Uuid,
    /// Email at login time.
    pub email: String,
    /// Customer or admin.
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// A signed token and its lifetime, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The compact JWT.
    pub token: String,
    /// Always `"Bearer"`.
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: i64,
}

/// HS256 key pair derived from one shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Build keys from a shared secret.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `sub` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue(
        &self,
        sub: Uuid,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            email: email.to_owned(),
            role,
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encode)?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: ttl.num_seconds(),
        })
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] for any malformed, expired, or
    /// foreign token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"kV9$fq2!Lz7#pW4@xN8&mR3*tB6^yH1%";

    #[test]
    fn test_issue_and_verify() {
        let keys = TokenKeys::from_secret(SECRET);
        let sub = Uuid::new_v4();
        let issued = keys
            .issue(sub, "shopper@example.com", Role::Customer, Duration::hours(1))
            .unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = keys.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let keys = TokenKeys::from_secret(SECRET);
        let other = TokenKeys::from_secret(b"a-completely-different-secret-value!!");
        let issued = keys
            .issue(Uuid::new_v4(), "a@b.c", Role::Admin, Duration::hours(1))
            .unwrap();
        assert!(matches!(other.verify(&issued.token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let keys = TokenKeys::from_secret(SECRET);
        let issued = keys
            .issue(Uuid::new_v4(), "a@b.c", Role::Admin, Duration::seconds(-60))
            .unwrap();
        assert!(keys.verify(&issued.token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let keys = TokenKeys::from_secret(SECRET);
        assert!(keys.verify("not.a.jwt").is_err());
    }
}
