//! Handlers for webhook submission and job lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use catcher_core::types::DbId;
use catcher_db::models::job::Job;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::signature::SignedBody;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /webhook`.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub url: String,
}

/// POST /webhook
///
/// Queue a URL for processing. Returns 201 with the created job.
pub async fn submit_webhook(
    State(state): State<AppState>,
    SignedBody(body): SignedBody,
) -> AppResult<impl IntoResponse> {
    let input: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;

    if input.url.is_empty() {
        return Err(AppError::BadRequest("url is required".into()));
    }

    let job = state.service.submit(&input.url).await?;

    tracing::info!(job_id = job.id, url = %job.url, "Job queued");

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = state.service.get(id).await?;
    Ok(Json(DataResponse { data: job }))
}
