//! Admin-only lock management (dashboard listing and force release).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::locking::EntityRef;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/locks
///
/// Lists every unexpired lock, soonest expiry first.
pub async fn list_locks(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let locks = state.locks.active_locks().await;
    Ok(Json(DataResponse { data: locks }))
}

/// POST /api/v1/admin/locks/release
///
/// Drops the lock on an entity regardless of who holds it.
pub async fn force_release_lock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<EntityRef>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(entity) = payload?;

    let released = state.locks.force_release(&entity).await?;

    if released {
        tracing::warn!(
            admin_id = %admin.user_id(),
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            "Lock force-released by admin"
        );
    }

    Ok(Json(DataResponse {
        data: serde_json::json!({ "released": released }),
    }))
}
