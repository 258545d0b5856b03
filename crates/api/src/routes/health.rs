use std::collections::BTreeMap;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Job count per status. Absent when the database is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<BTreeMap<&'static str, i64>>,
}

/// GET /health -- returns service, database, and queue health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = catcher_db::health_check(state.service.pool()).await.is_ok();

    let queue = if db_healthy {
        match state.service.queue_summary().await {
            Ok(summary) => Some(
                summary
                    .into_iter()
                    .map(|(status, count)| (status.as_str(), count))
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to summarize queue");
                None
            }
        }
    } else {
        None
    };

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        queue,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
