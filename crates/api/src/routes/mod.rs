pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree.
///
/// ```text
/// POST /webhook        queue a URL
/// GET  /jobs/{id}      job status
/// ```
///
/// `/health` is mounted separately by the router builder.
pub fn app_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
