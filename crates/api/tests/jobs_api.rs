//! Integration tests for webhook intake and job lookup.

mod common;

use axum::http::StatusCode;
use catcher_db::repositories::JobRepo;
use common::{body_json, get, post_json};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// POST /webhook
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_queues_pending_job(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(app, "/webhook", r#"{"url":"https://example.com/watch?v=1"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["url"], "https://example.com/watch?v=1");
    assert_eq!(data["status"], "pending");
    assert_eq!(data["attempts"], 0);
    assert_eq!(data["error"], "");

    let id = data["id"].as_i64().unwrap();
    let stored = JobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.url, "https://example.com/watch?v=1");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_timestamps_use_fixed_utc_format(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let json = body_json(post_json(app, "/webhook", r#"{"url":"https://example.com/a"}"#).await).await;

    let created = json["data"]["created_at"].as_str().unwrap();
    assert_eq!(created.len(), "2026-01-01T00:00:00Z".len());
    assert!(created.ends_with('Z'));
    assert!(chrono::NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%SZ").is_ok());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_without_url_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());

    for body in [r#"{}"#, r#"{"url":""}"#] {
        let response = post_json(app.clone(), "/webhook", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "url is required");
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    assert!(JobRepo::find_pending(&pool, 10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_with_invalid_url_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(app, "/webhook", r#"{"url":"definitely not a url"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    assert!(JobRepo::find_pending(&pool, 10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_with_malformed_json_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/webhook", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// GET /jobs/{id}
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn get_job_reflects_current_state(pool: SqlitePool) {
    let job = JobRepo::create(&pool, "https://example.com/a").await.unwrap();
    JobRepo::claim(&pool, job.id).await.unwrap();
    JobRepo::retry(&pool, job.id, "exit status: 1").await.unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/jobs/{}", job.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], job.id);
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["attempts"], 1);
    assert_eq!(json["data"]["error"], "exit status: 1");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_missing_job_returns_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = get(app, "/jobs/424242").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Job with id 424242 not found");
}
