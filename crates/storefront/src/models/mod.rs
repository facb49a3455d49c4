//! Domain models for the storefront.
//!
//! These are the validated shapes handed to route handlers and serialized
//! to clients; database row types stay private to `db`.

pub mod catalog;
pub mod order;
pub mod user;

pub use catalog::{Category, ProductDetail, ProductImage, ProductSummary};
pub use order::{OrderDetail, OrderItem, OrderSummary, PaymentSummary, ShippingAddress};
pub use user::{CurrentCustomer, User};
