//! Status enums for orders, payments, and token roles.
//!
//! All three are stored as snake_case TEXT columns, so the `postgres`
//! feature encodes them through their string form instead of a native
//! Postgres enum type.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

/// Implements `Display`, `FromStr` and TEXT-backed sqlx traits for a
/// unit-only enum from a list of `Variant => "text"` pairs.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored/serialized form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(s.parse()?)
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for payment.
    #[default]
    Pending,
    /// Payment verified.
    Paid,
    /// Being packed.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Abandoned or cancelled before delivery.
    Cancelled,
    /// Money returned.
    Refunded,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    ///
    /// ```text
    /// pending    -> paid | cancelled
    /// paid       -> processing | cancelled | refunded
    /// processing -> shipped | cancelled | refunded
    /// shipped    -> delivered
    /// delivered  -> refunded
    /// cancelled, refunded: terminal
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Processing | Self::Cancelled | Self::Refunded)
                | (
                    Self::Processing,
                    Self::Shipped | Self::Cancelled | Self::Refunded
                )
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Refunded)
        )
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Statuses that count toward revenue.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Processing | Self::Shipped | Self::Delivered
        )
    }
}

/// Payment attempt status, mirrored from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Gateway order created; customer has not paid yet.
    #[default]
    Created,
    /// Signature verified or capture webhook received.
    Paid,
    /// Signature mismatch or failure webhook received.
    Failed,
}

text_enum!(PaymentStatus, "payment status", {
    Created => "created",
    Paid => "paid",
    Failed => "failed",
});

/// Role carried in a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Storefront shopper.
    Customer,
    /// Store administrator.
    Admin,
}

text_enum!(Role, "role", {
    Customer => "customer",
    Admin => "admin",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert!("shipping".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde_matches_text() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_happy_path_transitions() {
        use OrderStatus::*;
        let path = [Pending, Paid, Processing, Shipped, Delivered, Refunded];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_rejected_transitions() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Paid));
        for next in OrderStatus::ALL {
            assert!(!Cancelled.can_transition_to(*next));
            assert!(!Refunded.can_transition_to(*next));
        }
    }

    #[test]
    fn test_is_paid() {
        assert!(!OrderStatus::Pending.is_paid());
        assert!(OrderStatus::Shipped.is_paid());
        assert!(!OrderStatus::Refunded.is_paid());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role: root");
    }
}
