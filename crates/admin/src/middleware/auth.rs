//! Authentication extractors for admin.
//!
//! Admins send the token from `POST /api/admin/auth/verify-otp` as
//! `Authorization: Bearer <token>`. The extractor checks signature, expiry
//! and role only; handlers that need the admin row load it themselves.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use emporium_core::{Role, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Extractor that requires a valid admin token.
///
/// Missing or invalid tokens are rejected with 401, tokens carrying any
/// other role with 403.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdmin(admin): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state
            .token_keys()
            .verify(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        if claims.role != Role::Admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        set_sentry_user(&claims.sub, Some(&claims.email));

        Ok(Self(CurrentAdmin {
            user_id: UserId::new(claims.sub),
            email: claims.email,
        }))
    }
}

/// The token from an `Authorization: Bearer` header, if present.
#[must_use]
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(auth: &str) -> Parts {
        Request::builder()
            .uri("/api/admin/stats")
            .header(AUTHORIZATION, auth)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_bearer_token_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&parts_with("BEARER tok")), Some("tok"));
        assert_eq!(bearer_token(&parts_with("Bearer  tok ")), Some("tok"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&parts_with("Token tok")), None);
        assert_eq!(bearer_token(&parts_with("Bearer")), None);
    }
}
