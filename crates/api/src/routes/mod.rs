pub mod admin;
pub mod health;
pub mod locks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /admin/locks                                     list active locks (admin)
/// /admin/locks/release                             force release (admin)
/// ```
///
/// The lock procedures themselves are mounted separately under
/// `/rest/v1/rpc` by [`crate::router::build_app_router`].
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/admin", admin::router())
}
