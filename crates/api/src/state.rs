use std::sync::Arc;

use catcher_worker::JobService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the service holds the pool and the config sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Job operations over the shared database pool.
    pub service: JobService,
    /// Server configuration (webhook secret, timeouts).
    pub config: Arc<ServerConfig>,
}
