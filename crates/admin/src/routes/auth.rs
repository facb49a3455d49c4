//! Admin login route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use emporium_core::Email;
use emporium_core::token::IssuedToken;

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::AdminUser;
use crate::services::auth::AdminAuthService;
use crate::state::AppState;

/// `POST /api/admin/auth/request-otp` body.
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    pub admin_key: String,
}

/// `POST /api/admin/auth/verify-otp` body.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Successful admin login.
#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub admin: AdminUser,
}

fn auth_service(state: &AppState) -> AdminAuthService<'_> {
    AdminAuthService::new(
        state.pool(),
        state.email(),
        state.token_keys(),
        state.auth_settings(),
    )
}

/// Check the admin key and email a login code.
///
/// POST /api/admin/auth/request-otp
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    auth_service(&state)
        .request_code(&body.email, &body.admin_key)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "A login code has been sent to your email" })),
    ))
}

/// Exchange a login code for an admin token.
///
/// POST /api/admin/auth/verify-otp
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<AdminLoginResponse>> {
    let (token, admin) = auth_service(&state)
        .verify_code(&body.email, &body.code)
        .await?;

    Ok(Json(AdminLoginResponse { token, admin }))
}

/// The admin behind the token.
///
/// GET /api/admin/auth/me
///
/// Unlike the other admin routes this re-reads the admin row, so a
/// deactivated admin learns immediately that their token is dead.
#[instrument(skip(state, current), fields(user_id = %current.user_id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAdmin(current): RequireAdmin,
) -> Result<Json<AdminUser>> {
    let email = Email::parse(&current.email)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    AdminUserRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .filter(|admin| admin.is_active)
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Admin account is not active".to_string()))
}
