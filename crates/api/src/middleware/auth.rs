//! Bearer-token extractor identifying the caller of a lock procedure.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use crm_core::error::CoreError;
use crm_core::locking::LockHolder;
use crm_core::types::UserId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The caller, taken from the JWT in `Authorization: Bearer <token>`.
///
/// Lock ownership is keyed on `holder.id`; the name and email are what other
/// users see while this caller holds a lock.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub holder: LockHolder,
    /// Role name from the token (e.g. `"admin"`, `"sales_rep"`).
    pub role: String,
}

impl AuthUser {
    pub fn user_id(&self) -> UserId {
        self.holder.id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser {
            holder: claims.holder(),
            role: claims.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}
