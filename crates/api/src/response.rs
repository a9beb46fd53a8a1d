//! Shared response envelope types for API handlers.
//!
//! Admin endpoints use a `{ "data": ... }` envelope. The `/rest/v1/rpc/*`
//! procedures return their bare value instead, matching the managed backend
//! the CRM client talks to.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: locks }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
