//! OTP login route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use emporium_core::token::IssuedToken;

use crate::error::Result;
use crate::models::User;
use crate::services::auth::OtpAuthService;
use crate::state::AppState;

/// `POST /api/auth/request-otp` body.
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `POST /api/auth/verify-otp` body.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: User,
}

/// Email a login code.
///
/// POST /api/auth/request-otp
///
/// The response does not reveal whether the account existed before.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    OtpAuthService::new(
        state.pool(),
        state.email(),
        state.token_keys(),
        state.auth_settings(),
    )
    .request_code(&body.email, body.full_name.as_deref(), body.phone.as_deref())
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "A login code has been sent to your email" })),
    ))
}

/// Exchange a login code for a bearer token.
///
/// POST /api/auth/verify-otp
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<LoginResponse>> {
    let (token, user) = OtpAuthService::new(
        state.pool(),
        state.email(),
        state.token_keys(),
        state.auth_settings(),
    )
    .verify_code(&body.email, &body.code)
    .await?;

    Ok(Json(LoginResponse { token, user }))
}
