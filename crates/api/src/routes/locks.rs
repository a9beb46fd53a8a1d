//! Route definitions for the record-lock procedures.
//!
//! All endpoints require authentication via `AuthUser` extractor.

use axum::routing::post;
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock procedure routes mounted at `/rest/v1/rpc`.
///
/// ```text
/// POST /acquire_record_lock          -> acquire_record_lock
/// POST /release_record_lock          -> release_record_lock
/// POST /is_record_locked_by_other    -> is_record_locked_by_other
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/acquire_record_lock", post(locks::acquire_record_lock))
        .route("/release_record_lock", post(locks::release_record_lock))
        .route(
            "/is_record_locked_by_other",
            post(locks::is_record_locked_by_other),
        )
}
