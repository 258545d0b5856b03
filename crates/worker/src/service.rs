//! Validating façade over [`JobRepo`].
//!
//! Centralizes the job vocabulary used by the HTTP layer and the worker:
//! submissions are validated here before any row exists, and store results
//! that mean "absent" are turned into [`CoreError::NotFound`].

use catcher_core::error::CoreError;
use catcher_core::job::{self, JobStatus};
use catcher_core::types::DbId;
use catcher_db::models::job::Job;
use catcher_db::repositories::JobRepo;
use catcher_db::DbPool;

/// Errors surfaced by [`JobService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure, passed through unmodified.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// `true` for a lookup miss or a lost claim.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

fn not_found(id: DbId) -> ServiceError {
    ServiceError::Core(CoreError::NotFound { entity: "Job", id })
}

/// Job operations shared by the HTTP handlers and the worker.
///
/// Cheap to clone: it only holds the pool.
#[derive(Clone)]
pub struct JobService {
    pool: DbPool,
}

impl JobService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Queue `url`. Fails with `InvalidUrl` before touching storage.
    pub async fn submit(&self, url: &str) -> ServiceResult<Job> {
        job::validate_url(url)?;
        Ok(JobRepo::create(&self.pool, url).await?)
    }

    pub async fn get(&self, id: DbId) -> ServiceResult<Job> {
        JobRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn get_pending(&self, limit: i64) -> ServiceResult<Vec<Job>> {
        Ok(JobRepo::find_pending(&self.pool, limit).await?)
    }

    /// Claim a pending job. `NotFound` if it is absent or already claimed.
    pub async fn mark_processing(&self, id: DbId) -> ServiceResult<()> {
        if JobRepo::claim(&self.pool, id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn mark_complete(&self, id: DbId) -> ServiceResult<()> {
        JobRepo::complete(&self.pool, id).await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: DbId, reason: &str) -> ServiceResult<()> {
        JobRepo::fail(&self.pool, id, reason).await?;
        Ok(())
    }

    pub async fn mark_retry(&self, id: DbId, reason: &str) -> ServiceResult<()> {
        JobRepo::retry(&self.pool, id, reason).await?;
        Ok(())
    }

    /// Reset jobs stranded in `processing` by a previous run.
    pub async fn recover_stale(&self) -> ServiceResult<u64> {
        Ok(JobRepo::recover_stale(&self.pool).await?)
    }

    /// Job counts per status, including zero counts.
    pub async fn queue_summary(&self) -> ServiceResult<Vec<(JobStatus, i64)>> {
        let counts = JobRepo::count_by_status(&self.pool).await?;
        Ok(JobStatus::ALL
            .iter()
            .map(|status| {
                let count = counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map_or(0, |(_, c)| *c);
                (*status, count)
            })
            .collect())
    }
}
