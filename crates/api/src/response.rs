//! Shared response envelope for API handlers.
//!
//! Successful responses use a `{ "data": ... }` envelope; use [`DataResponse`]
//! rather than ad-hoc `serde_json::json!({ "data": ... })`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
