//! Storefront API behavior that is decided before the database is reached.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use emporium_core::Role;
use emporium_integration_tests::{
    ADMIN_SECRET, STOREFRONT_SECRET, body_json, json_request, request, storefront_app, token,
};

#[tokio::test]
async fn test_health_is_ok() {
    let response = storefront_app()
        .unwrap()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = storefront_app()
        .unwrap()
        .oneshot(request("GET", "/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await.unwrap()["status"], "unavailable");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let response = storefront_app()
        .unwrap()
        .oneshot(
            request("GET", "/health")
                .header("x-request-id", "edge-7f3a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "edge-7f3a");
}

#[tokio::test]
async fn test_account_requires_token() {
    let response = storefront_app()
        .unwrap()
        .oneshot(request("GET", "/api/account").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await.unwrap()["error"],
        "Missing bearer token"
    );
}

#[tokio::test]
async fn test_admin_signed_token_is_rejected() {
    let admin_token = token(ADMIN_SECRET, Role::Customer).unwrap();
    let response = storefront_app()
        .unwrap()
        .oneshot(
            request("GET", "/api/orders")
                .header("authorization", format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_role_is_forbidden_on_customer_routes() {
    let admin_role = token(STOREFRONT_SECRET, Role::Admin).unwrap();
    let response = storefront_app()
        .unwrap()
        .oneshot(
            request("GET", "/api/account")
                .header("authorization", format!("Bearer {admin_role}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_contact_form_is_validated() {
    let body = json!({ "name": "  ", "email": "visitor@example.com", "message": "Hello" });
    let response = storefront_app()
        .unwrap()
        .oneshot(json_request("POST", "/api/contact", None, &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await.unwrap()["error"], "Name is required");
}

#[tokio::test]
async fn test_webhook_is_hidden_without_secret() {
    let response = storefront_app()
        .unwrap()
        .oneshot(
            json_request(
                "POST",
                "/api/payments/webhook",
                None,
                &json!({ "event": "payment.captured" }),
            )
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_requires_token() {
    let body = json!({ "items": [], "shipping_address": {} });
    let response = storefront_app()
        .unwrap()
        .oneshot(json_request("POST", "/api/payments/orders", None, &body).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_otp_requests_allow_a_burst_of_three() {
    let app = storefront_app().unwrap();
    let body = json!({ "email": "not-an-email" });

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/request-otp", None, &body).unwrap())
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert!(
        statuses
            .iter()
            .take(3)
            .all(|s| *s == StatusCode::BAD_REQUEST)
    );
    assert_eq!(statuses.get(3), Some(&StatusCode::TOO_MANY_REQUESTS));
}
