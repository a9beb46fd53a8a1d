//! Route definitions for admin lock management.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// GET  /locks            -> list_locks
/// POST /locks/release    -> force_release_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locks", get(admin::list_locks))
        .route("/locks/release", post(admin::force_release_lock))
}
