//! Admin API authentication and validation, up to the database boundary.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use emporium_core::Role;
use emporium_integration_tests::{
    ADMIN_SECRET, STOREFRONT_SECRET, admin_app, body_json, json_request, request, token,
};

#[tokio::test]
async fn test_health_is_ok() {
    let response = admin_app()
        .unwrap()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stats_require_token() {
    let response = admin_app()
        .unwrap()
        .oneshot(request("GET", "/api/admin/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_role_is_forbidden() {
    let customer = token(ADMIN_SECRET, Role::Customer).unwrap();
    let response = admin_app()
        .unwrap()
        .oneshot(
            request("GET", "/api/admin/products")
                .header("authorization", format!("Bearer {customer}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await.unwrap()["error"],
        "Admin access required"
    );
}

#[tokio::test]
async fn test_storefront_signed_admin_token_is_rejected() {
    let forged = token(STOREFRONT_SECRET, Role::Admin).unwrap();
    let response = admin_app()
        .unwrap()
        .oneshot(
            request("GET", "/api/admin/orders")
                .header("authorization", format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_otp_with_bad_email_is_uniform_401() {
    let body = json!({ "email": "not-an-email", "admin_key": "whatever" });
    let response = admin_app()
        .unwrap()
        .oneshot(json_request("POST", "/api/admin/auth/request-otp", None, &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await.unwrap()["error"],
        "Invalid credentials"
    );
}

#[tokio::test]
async fn test_verify_otp_rejects_malformed_code() {
    let body = json!({ "email": "admin@example.com", "code": "12ab" });
    let response = admin_app()
        .unwrap()
        .oneshot(json_request("POST", "/api/admin/auth/verify-otp", None, &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_product_validates_before_writing() {
    let admin = token(ADMIN_SECRET, Role::Admin).unwrap();
    let body = json!({ "name": "Copper Kettle", "price": "10.00", "compare_at_price": "5.00" });
    let response = admin_app()
        .unwrap()
        .oneshot(json_request("POST", "/api/admin/products", Some(&admin), &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await.unwrap()["error"],
        "compare_at_price must not be below price"
    );
}

#[tokio::test]
async fn test_negative_stock_is_rejected() {
    let admin = token(ADMIN_SECRET, Role::Admin).unwrap();
    let uri = format!("/api/admin/products/{}/stock", Uuid::new_v4());
    let response = admin_app()
        .unwrap()
        .oneshot(json_request("PATCH", &uri, Some(&admin), &json!({ "stock_qty": -3 })).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_url_must_be_http() {
    let admin = token(ADMIN_SECRET, Role::Admin).unwrap();
    let uri = format!("/api/admin/products/{}/images", Uuid::new_v4());
    let body = json!({ "url": "ftp://cdn.example.com/kettle.jpg" });
    let response = admin_app()
        .unwrap()
        .oneshot(json_request("POST", &uri, Some(&admin), &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_status_is_rejected() {
    let admin = token(ADMIN_SECRET, Role::Admin).unwrap();
    let uri = format!("/api/admin/orders/{}/status", Uuid::new_v4());
    let response = admin_app()
        .unwrap()
        .oneshot(
            json_request("PATCH", &uri, Some(&admin), &json!({ "status": "teleported" })).unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_otp_endpoints_are_rate_limited() {
    let app = admin_app().unwrap();
    let body = json!({ "email": "nope", "admin_key": "x" });

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/admin/auth/request-otp", None, &body).unwrap())
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
