#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use catcher_api::config::ServerConfig;
use catcher_api::router::build_app_router;
use catcher_api::state::AppState;
use catcher_worker::JobService;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and no webhook secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        db_path: PathBuf::from(":memory:"),
        config_path: PathBuf::from("/nonexistent/catcher.toml"),
        poll_interval_secs: 5,
        max_retries: 3,
        webhook_secret: None,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 10,
    }
}

/// Build the full application router over `pool`, exactly as the binary does.
pub fn build_test_app(pool: SqlitePool) -> Router {
    build_app_with_config(pool, test_config())
}

/// Same as [`build_test_app`] with webhook signatures required.
pub fn build_signed_test_app(pool: SqlitePool, secret: &str) -> Router {
    let config = ServerConfig {
        webhook_secret: Some(secret.to_string()),
        ..test_config()
    };
    build_app_with_config(pool, config)
}

fn build_app_with_config(pool: SqlitePool, config: ServerConfig) -> Router {
    let state = AppState {
        service: JobService::new(pool),
        config: Arc::new(config),
    };
    build_app_router(state)
}

/// Issue a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Issue a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
