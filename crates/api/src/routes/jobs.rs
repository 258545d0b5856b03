//! Route definitions for webhook intake and job lookup.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// ```text
/// POST   /webhook       -> submit_webhook
/// GET    /jobs/{id}     -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(jobs::submit_webhook))
        .route("/jobs/{id}", get(jobs::get_job))
}
