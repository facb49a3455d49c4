//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Characters other than digits, a leading `+`, spaces, dashes or parentheses.
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number stored in a compact form: an optional leading `+` followed
/// by 7-15 digits (E.164 allows at most 15).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    const MIN_DIGITS: usize = 7;
    const MAX_DIGITS: usize = 15;

    /// Parse a phone number, dropping separators.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError`] if the input has stray characters or the wrong
    /// number of digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        let (plus, rest) = s.strip_prefix('+').map_or((false, s), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len() + 1);
        if plus {
            digits.push('+');
        }
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let count = digits.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the compact phone number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        assert_eq!(Phone::parse("+91 98765-43210").unwrap().as_str(), "+919876543210");
        assert_eq!(Phone::parse("(022) 2345 6789").unwrap().as_str(), "02223456789");
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(Phone::parse("98765abc"), Err(PhoneError::InvalidCharacter));
        assert_eq!(Phone::parse("+91+9876543"), Err(PhoneError::InvalidCharacter));
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(matches!(
            Phone::parse("12345"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }
}
