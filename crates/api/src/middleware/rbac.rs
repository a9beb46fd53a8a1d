//! Role checks for lock administration.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crm_core::error::CoreError;
use crm_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// An [`AuthUser`] holding the `admin` role. Anyone else gets 403.
///
/// Guards the endpoints that see or drop other users' locks. Managers and
/// sales reps only ever touch their own locks through the lock procedures.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            tracing::debug!(user_id = %user.user_id(), role = %user.role, "Admin role required");
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}
