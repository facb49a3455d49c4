//! Domain models for admin.
//!
//! Read models derive `sqlx::FromRow` where a query maps onto them directly;
//! write inputs carry a `validated()` step run before any query.

pub mod admin_user;
pub mod catalog;
pub mod contact;
pub mod order;
pub mod stats;

pub use admin_user::{AdminUser, CurrentAdmin};
pub use catalog::{
    Category, CategoryInput, ImageInput, Product, ProductDetail, ProductImage, ProductInput,
    ProductSummary,
};
pub use contact::ContactMessage;
pub use order::{OrderCustomer, OrderDetail, OrderItem, OrderSummary, Payment, StatusUpdate};
pub use stats::{Revenue, StoreStats};
