//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                      - Liveness
//! GET    /health/ready                                - Readiness (database ping)
//!
//! # Auth (strict per-IP limit)
//! POST   /api/admin/auth/request-otp                  - Admin key check, email a code
//! POST   /api/admin/auth/verify-otp                   - Exchange a code for an admin token
//!
//! # Everything below needs an admin token
//! GET    /api/admin/auth/me
//! GET    /api/admin/products                          - All products, filters + pagination
//! POST   /api/admin/products
//! GET    /api/admin/products/{id}
//! PUT    /api/admin/products/{id}
//! DELETE /api/admin/products/{id}                     - 409 once ordered
//! PATCH  /api/admin/products/{id}/stock
//! POST   /api/admin/products/{id}/images
//! DELETE /api/admin/products/{id}/images/{image_id}
//! GET    /api/admin/categories
//! POST   /api/admin/categories
//! PUT    /api/admin/categories/{id}
//! DELETE /api/admin/categories/{id}                   - Products are detached
//! GET    /api/admin/orders                            - ?status= filter
//! GET    /api/admin/orders/{id}
//! PATCH  /api/admin/orders/{id}/status                - 409 off the transition table
//! GET    /api/admin/contact-messages                  - ?resolved= filter
//! PATCH  /api/admin/contact-messages/{id}
//! GET    /api/admin/stats
//! ```

pub mod auth;
pub mod categories;
pub mod contact;
pub mod orders;
pub mod products;
pub mod stats;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use serde_json::{Value, json};

use crate::middleware::{api_rate_limiter, otp_rate_limiter};
use crate::state::AppState;

/// Create the admin OTP routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-otp", post(auth::request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .layer(otp_rate_limiter())
}

/// Create the token-protected admin routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/{id}/stock", patch(products::update_stock))
        .route("/products/{id}/images", post(products::add_image))
        .route(
            "/products/{id}/images/{image_id}",
            delete(products::delete_image),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/contact-messages", get(contact::list_messages))
        .route("/contact-messages/{id}", patch(contact::update_message))
        .route("/stats", get(stats::get_stats))
        .layer(api_rate_limiter())
}

/// Create all routes for the admin API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/admin/auth", auth_routes())
        .nest("/api/admin", api_routes())
}

/// Liveness health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
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
