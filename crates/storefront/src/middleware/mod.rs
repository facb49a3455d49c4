//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded into the span, echoed in the response)
//! 4. CORS
//! 5. Rate limiting (per route group)
//!
//! Authentication is an extractor (`RequireCustomer`), not a layer.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireCustomer;
pub use rate_limit::{api_rate_limiter, otp_rate_limiter};
pub use request_id::request_id_middleware;
