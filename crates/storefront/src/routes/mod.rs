//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                  - Liveness
//! GET   /health/ready            - Readiness (database ping)
//!
//! # Catalog
//! GET   /api/categories          - Category list
//! GET   /api/products            - Product listing (filters + pagination)
//! GET   /api/products/{slug}     - Product detail
//!
//! # Auth (rate limited per IP)
//! POST  /api/auth/request-otp    - Email a login code
//! POST  /api/auth/verify-otp     - Exchange a code for a bearer token
//!
//! # Account (bearer token)
//! GET   /api/account             - Profile
//! PATCH /api/account             - Update profile
//! GET   /api/orders              - Order history
//! GET   /api/orders/{id}         - Order detail
//!
//! # Payments
//! POST  /api/payments/orders     - Price cart, open gateway order (bearer token)
//! POST  /api/payments/verify     - Verify checkout signature (bearer token)
//! POST  /api/payments/webhook    - Gateway webhook (signed body)
//!
//! # Contact
//! POST  /api/contact             - Contact form
//! ```

pub mod account;
pub mod auth;
pub mod catalog;
pub mod contact;
pub mod orders;
pub mod payments;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::middleware::{api_rate_limiter, otp_rate_limiter};
use crate::state::AppState;

/// Create the OTP auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-otp", post(auth::request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .layer(otp_rate_limiter())
}

/// Create the rate-limited API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::get_product))
        .route(
            "/account",
            get(account::get_account).patch(account::update_account),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/payments/orders", post(payments::create_order))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/contact", post(contact::submit))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        // Webhooks come from the gateway's IP pool, not from shoppers.
        .route("/api/payments/webhook", post(payments::webhook))
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_health_is_plain_ok() {
        let app: Router = Router::new().route("/health", get(health));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
