//! Decimal money amounts and currency codes.
//!
//! Prices are stored as `NUMERIC(12,2)` in major units (rupees, dollars).
//! Payment gateways want integer minor units (paise, cents), so conversion
//! is explicit and fallible.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors produced by money arithmetic and parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount has more decimal places than the currency supports.
    #[error("amount {0} has sub-minor-unit precision")]
    FractionalMinorUnits(Decimal),
    /// Amount does not fit the target integer type.
    #[error("amount {0} is out of range")]
    Overflow(Decimal),
    /// Negative amounts are never valid prices.
    #[error("amount {0} is negative")]
    Negative(Decimal),
    /// Unknown ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Number of minor units per major unit (all supported currencies use 2 decimals).
    #[must_use]
    pub const fn minor_unit_scale(self) -> u32 {
        2
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_owned())),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Currency {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Currency {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Currency {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}

/// An amount of money in a currency's major unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Build an amount from integer minor units (e.g. paise).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: Currency) -> Self {
        Self::new(Decimal::new(minor, currency.minor_unit_scale()), currency)
    }

    /// Convert to integer minor units, as payment gateways expect.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has precision below one
    /// minor unit, or overflows `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(MoneyError::Negative(self.amount));
        }
        let factor = Decimal::from(10_i64.pow(self.currency.minor_unit_scale()));
        let scaled = self
            .amount
            .checked_mul(factor)
            .ok_or(MoneyError::Overflow(self.amount))?;
        if !scaled.fract().is_zero() {
            return Err(MoneyError::FractionalMinorUnits(self.amount));
        }
        scaled.to_i64().ok_or(MoneyError::Overflow(self.amount))
    }

    /// Multiply by a quantity (line totals).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the product does not fit.
    pub fn times(&self, quantity: u32) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow(self.amount))?;
        Ok(Self::new(amount, self.currency))
    }

    /// Add another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the sum does not fit.
    pub fn checked_add(&self, other: Decimal) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_add(other)
            .ok_or(MoneyError::Overflow(self.amount))?;
        Ok(Self::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_to_minor_units() {
        let price = Money::new(Decimal::new(49_950, 2), Currency::INR);
        assert_eq!(price.to_minor_units().unwrap(), 49_950);

        let whole = Money::new(Decimal::from(1_299), Currency::INR);
        assert_eq!(whole.to_minor_units().unwrap(), 129_900);
    }

    #[test]
    fn test_to_minor_units_rejects_sub_paise() {
        let price = Money::new(Decimal::new(10_005, 3), Currency::INR);
        assert!(matches!(
            price.to_minor_units(),
            Err(MoneyError::FractionalMinorUnits(_))
        ));
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        let price = Money::new(Decimal::new(-100, 2), Currency::USD);
        assert!(matches!(price.to_minor_units(), Err(MoneyError::Negative(_))));
    }

    #[test]
    fn test_from_minor_units() {
        let price = Money::from_minor_units(12_345, Currency::USD);
        assert_eq!(price.amount, Decimal::new(12_345, 2));
        assert_eq!(price.to_string(), "USD 123.45");
    }

    #[test]
    fn test_times_and_add() {
        let unit = Money::new(Decimal::new(250, 2), Currency::INR);
        let line = unit.times(4).unwrap();
        assert_eq!(line.amount, Decimal::from(10));
        let total = line.checked_add(Decimal::new(75, 2)).unwrap();
        assert_eq!(total.amount, Decimal::new(1075, 2));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(" inr ".parse::<Currency>().unwrap(), Currency::INR);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}
