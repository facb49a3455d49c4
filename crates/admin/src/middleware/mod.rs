//! HTTP middleware for the admin API.
//!
//! Same stack as the storefront: Sentry, trace span, request ID, CORS,
//! then per-group rate limits. Authentication is the `RequireAdmin`
//! extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAdmin;
pub use rate_limit::{api_rate_limiter, otp_rate_limiter};
pub use request_id::request_id_middleware;
