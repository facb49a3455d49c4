//! One-time password rules.
//!
//! The lifecycle is generate → store → expire → consume. Storage lives in the
//! binaries (`otp_codes` table); this module owns the parts that do not need
//! I/O: code generation, the stored digest format, and the acceptance check
//! against a fetched row.
//!
//! Codes are never stored in clear text. The `code` column holds the SHA-256
//! hex digest of the six digits prefixed with the login flow they were issued
//! for, so a customer code never verifies as an admin code and vice versa.

use core::fmt;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of digits in a code.
pub const CODE_LENGTH: usize = 6;

/// Default lifetime of an issued code.
pub const DEFAULT_TTL_MINUTES: i64 = 10;

/// Why a code was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    /// Input is not six ASCII digits.
    #[error("code must be {CODE_LENGTH} digits")]
    Malformed,
    /// No unused code exists for the user.
    #[error("no active code")]
    Missing,
    /// Code was already consumed.
    #[error("code already used")]
    Used,
    /// Code is past its expiry.
    #[error("code expired")]
    Expired,
    /// Code does not match.
    #[error("code does not match")]
    Mismatch,
}

/// Login flow a code is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    /// Storefront customer login.
    Customer,
    /// Admin API login.
    Admin,
}

impl OtpPurpose {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Customer => "customer:",
            Self::Admin => "admin:",
        }
    }
}

/// A six-digit one-time password.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Generate a uniformly random code (leading zeros allowed).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    /// Parse user input (surrounding whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Malformed`] unless the input is exactly six digits.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        let s = s.trim();
        if s.len() == CODE_LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(OtpError::Malformed)
        }
    }

    /// The digits, for the outgoing email only.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest stored in `otp_codes.code` for a code issued for `purpose`.
    #[must_use]
    pub fn digest_for(&self, purpose: OtpPurpose) -> String {
        let mut hasher = Sha256::new();
        hasher.update(purpose.prefix().as_bytes());
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

/// Expiry timestamp for a code issued at `now`.
#[must_use]
pub fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now + ttl
}

/// The fields of an `otp_codes` row that decide acceptance.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    /// SHA-256 hex digest of the issued code.
    pub code_digest: String,
    /// Instant after which the code is rejected.
    pub expires_at: DateTime<Utc>,
    /// Whether the code was consumed or superseded.
    pub used: bool,
}

impl OtpRecord {
    /// Check a candidate code, submitted to the `purpose` flow, against this
    /// record at time `now`.
    ///
    /// Checks run in order: used, expired, then digest comparison. The
    /// comparison is constant-time. A record issued for another purpose
    /// fails as a mismatch.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`OtpError`].
    pub fn check_for(
        &self,
        candidate: &OtpCode,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        if self.used {
            return Err(OtpError::Used);
        }
        if now >= self.expires_at {
            return Err(OtpError::Expired);
        }
        if !constant_time_eq(&candidate.digest_for(purpose), &self.code_digest) {
            return Err(OtpError::Mismatch);
        }
        Ok(())
    }
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record_for(code: &OtpCode, expires_at: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            code_digest: code.digest_for(OtpPurpose::Customer),
            expires_at,
            used: false,
        }
    }

    #[test]
    fn test_generate_format() {
        for _ in 0..200 {
            let code = OtpCode::generate();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(OtpCode::parse(" 012345 ").unwrap().as_str(), "012345");
        assert_eq!(OtpCode::parse("12345"), Err(OtpError::Malformed));
        assert_eq!(OtpCode::parse("12a456"), Err(OtpError::Malformed));
        assert_eq!(OtpCode::parse("1234567"), Err(OtpError::Malformed));
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let code = OtpCode::parse("000000").unwrap();
        let digest = code.digest_for(OtpPurpose::Customer);
        assert_eq!(digest.len(), 64);
        assert_ne!(
            digest,
            OtpCode::parse("000001")
                .unwrap()
                .digest_for(OtpPurpose::Customer)
        );
        assert_ne!(digest, code.digest_for(OtpPurpose::Admin));
    }

    #[test]
    fn test_check_accepts_fresh_matching_code() {
        let now = Utc::now();
        let code = OtpCode::parse("482913").unwrap();
        let record = record_for(&code, expiry_from(now, Duration::minutes(10)));
        assert_eq!(record.check_for(&code, OtpPurpose::Customer, now), Ok(()));
    }

    #[test]
    fn test_check_rejects_mismatch() {
        let now = Utc::now();
        let issued = OtpCode::parse("482913").unwrap();
        let record = record_for(&issued, now + Duration::minutes(10));
        let guess = OtpCode::parse("482914").unwrap();
        assert_eq!(record.check_for(&guess, OtpPurpose::Customer, now), Err(OtpError::Mismatch));
    }

    #[test]
    fn test_check_rejects_at_exact_expiry() {
        let now = Utc::now();
        let code = OtpCode::parse("111111").unwrap();
        let record = record_for(&code, now);
        assert_eq!(record.check_for(&code, OtpPurpose::Customer, now), Err(OtpError::Expired));
    }

    #[test]
    fn test_customer_code_rejected_by_admin_flow() {
        let now = Utc::now();
        let issued = OtpCode::generate();
        let record = record_for(&issued, now + Duration::minutes(10));
        let submitted = OtpCode::parse(issued.as_str()).unwrap();
        assert_eq!(
            record.check_for(&submitted, OtpPurpose::Admin, now),
            Err(OtpError::Mismatch)
        );
        assert_eq!(
            record.check_for(&submitted, OtpPurpose::Customer, now),
            Ok(())
        );
    }

    #[test]
    fn test_admin_code_rejected_by_customer_flow() {
        let now = Utc::now();
        let issued = OtpCode::parse("731904").unwrap();
        let record = OtpRecord {
            code_digest: issued.digest_for(OtpPurpose::Admin),
            expires_at: now + Duration::minutes(10),
            used: false,
        };
        assert_eq!(
            record.check_for(&issued, OtpPurpose::Customer, now),
            Err(OtpError::Mismatch)
        );
        assert_eq!(record.check_for(&issued, OtpPurpose::Admin, now), Ok(()));
    }

    #[test]
    fn test_used_wins_over_expired() {
        let now = Utc::now();
        let code = OtpCode::parse("111111").unwrap();
        let mut record = record_for(&code, now - Duration::minutes(1));
        record.used = true;
        assert_eq!(record.check_for(&code, OtpPurpose::Customer, now), Err(OtpError::Used));
    }

    #[test]
    fn test_debug_redacts() {
        let code = OtpCode::parse("123456").unwrap();
        assert!(!format!("{code:?}").contains("123456"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
