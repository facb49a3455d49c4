//! Customer profile route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::Phone;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::User;
use crate::services::auth::normalize_name;
use crate::state::AppState;

/// `PATCH /api/account` body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Current customer's profile.
///
/// GET /api/account
pub async fn get_account(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(customer.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Account".to_string()))
}

/// Update the current customer's profile.
///
/// PATCH /api/account
#[instrument(skip(state, body), fields(user_id = %customer.id))]
pub async fn update_account(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<Json<User>> {
    let full_name = normalize_name(body.full_name.as_deref())?;
    let phone = body
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Phone::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("Invalid phone number: {e}")))?;

    let user = UserRepository::new(state.pool())
        .update_profile(customer.id, full_name.as_deref(), phone.as_ref())
        .await?;

    Ok(Json(user))
}
