use std::sync::Arc;

use crate::config::ServerConfig;
use crate::lock_store::LockStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT secret used by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// The record lock table.
    pub locks: Arc<LockStore>,
}
