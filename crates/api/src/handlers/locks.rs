//! Handlers for the record-lock procedures.
//!
//! These mirror the backend RPC surface the CRM client calls:
//! `acquire_record_lock`, `release_record_lock`, and
//! `is_record_locked_by_other`. A refused acquire or a release of a lock the
//! caller does not hold answers `false` with `200 OK`; only malformed input
//! and auth failures produce error responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use crm_core::locking::{AcquireLockParams, EntityRef, LockStatus};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// POST /rest/v1/rpc/acquire_record_lock
///
/// Returns `true` if the caller now holds the lock, `false` if another user
/// holds an unexpired lock on the entity.
pub async fn acquire_record_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<AcquireLockParams>, JsonRejection>,
) -> AppResult<Json<bool>> {
    let Json(input) = payload?;
    let entity = input.entity();

    let acquired = state
        .locks
        .acquire(&entity, &auth.holder, input.lock_duration_minutes)
        .await?;

    if acquired {
        tracing::info!(
            user_id = %auth.user_id(),
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            duration_mins = input.lock_duration_minutes,
            "Lock acquired"
        );
    } else {
        tracing::debug!(
            user_id = %auth.user_id(),
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            "Lock held by another user"
        );
    }

    Ok(Json(acquired))
}

/// POST /rest/v1/rpc/release_record_lock
///
/// Returns `true` if the caller's lock was released, `false` if the caller
/// held no active lock on the entity.
pub async fn release_record_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<EntityRef>, JsonRejection>,
) -> AppResult<Json<bool>> {
    let Json(entity) = payload?;

    let released = state.locks.release(&entity, auth.user_id()).await?;

    if released {
        tracing::info!(
            user_id = %auth.user_id(),
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            "Lock released"
        );
    } else {
        tracing::debug!(
            user_id = %auth.user_id(),
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            "Release skipped, caller holds no active lock"
        );
    }

    Ok(Json(released))
}

/// POST /rest/v1/rpc/is_record_locked_by_other
///
/// Reports the holder and timestamps when someone other than the caller
/// holds an unexpired lock, and `{ "locked": false }` otherwise.
pub async fn is_record_locked_by_other(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<EntityRef>, JsonRejection>,
) -> AppResult<Json<LockStatus>> {
    let Json(entity) = payload?;

    let status = state.locks.locked_by_other(&entity, auth.user_id()).await?;
    Ok(Json(status))
}
