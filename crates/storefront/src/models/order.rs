//! Order and payment models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{Currency, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId};

/// Longest value accepted for any single address field.
const MAX_FIELD_LEN: usize = 200;

/// Shipping address captured at checkout and stored as JSONB on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: String,
}

fn default_country() -> String {
    "IN".to_owned()
}

impl ShippingAddress {
    /// Trim all fields and check required ones are present and bounded.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the offending field.
    pub fn validated(mut self) -> Result<Self, String> {
        let required = [
            ("full_name", &mut self.full_name),
            ("line1", &mut self.line1),
            ("city", &mut self.city),
            ("state", &mut self.state),
            ("postal_code", &mut self.postal_code),
            ("country", &mut self.country),
            ("phone", &mut self.phone),
        ];
        for (name, value) in required {
            *value = value.trim().to_owned();
            if value.is_empty() {
                return Err(format!("shipping_address.{name} is required"));
            }
            if value.len() > MAX_FIELD_LEN {
                return Err(format!("shipping_address.{name} is too long"));
            }
        }

        self.line2 = self
            .line2
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty());
        if self.line2.as_ref().is_some_and(|l| l.len() > MAX_FIELD_LEN) {
            return Err("shipping_address.line2 is too long".to_owned());
        }

        emporium_core::Phone::parse(&self.phone)
            .map_err(|e| format!("shipping_address.phone: {e}"))?;

        Ok(self)
    }
}

/// An order in a customer's history list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: Currency,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A line on an order, with the name and price frozen at purchase time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Latest payment attempt on an order (gateway secrets excluded).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentSummary {
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub updated_at: DateTime<Utc>,
}

/// Full order view for the owning customer.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub currency: Currency,
    pub shipping_address: serde_json::Value,
    pub items: Vec<OrderItem>,
    pub payment: Option<PaymentSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "  Asha Rao ".to_owned(),
            line1: "12 MG Road".to_owned(),
            line2: Some("   ".to_owned()),
            city: "Bengaluru".to_owned(),
            state: "KA".to_owned(),
            postal_code: "560001".to_owned(),
            country: "IN".to_owned(),
            phone: "+91 98450 12345".to_owned(),
        }
    }

    #[test]
    fn test_validated_trims_and_drops_blank_line2() {
        let addr = address().validated().unwrap();
        assert_eq!(addr.full_name, "Asha Rao");
        assert_eq!(addr.line2, None);
    }

    #[test]
    fn test_validated_rejects_missing_city() {
        let mut addr = address();
        addr.city = " ".to_owned();
        assert_eq!(
            addr.validated().unwrap_err(),
            "shipping_address.city is required"
        );
    }

    #[test]
    fn test_validated_rejects_bad_phone() {
        let mut addr = address();
        addr.phone = "call me".to_owned();
        assert!(addr.validated().unwrap_err().starts_with("shipping_address.phone"));
    }

    #[test]
    fn test_country_defaults_to_india() {
        let json = r#"{"full_name":"A","line1":"B","city":"C","state":"D","postal_code":"1","phone":"9845012345"}"#;
        let addr: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(addr.country, "IN");
    }
}
