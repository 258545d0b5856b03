//! Repository for the `jobs` table.
//!
//! Every state transition is a single `UPDATE` guarded by a predicate on the
//! current status. A guard that no longer holds affects zero rows, which is
//! how concurrent claims are resolved: SQLite serializes the writers and only
//! the first one sees `status = 'pending'`.

use catcher_core::job::{JobStatus, RECOVERY_MARKER};
use catcher_core::types::DbId;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::job::Job;

/// Column list for `jobs` queries.
const COLUMNS: &str = "id, url, status, attempts, error, created_at, updated_at";

/// Provides the persistence operations of the job lifecycle.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job with zero attempts.
    pub async fn create(pool: &SqlitePool, url: &str) -> Result<Job, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO jobs (url, status, attempts, error, created_at, updated_at) \
             VALUES (?, ?, 0, '', ?, ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(url)
            .bind(JobStatus::Pending.as_str())
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Up to `limit` pending jobs, oldest first.
    ///
    /// `id` breaks ties between jobs created within the same instant so the
    /// order always matches submission order.
    pub async fn find_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status = ? \
             ORDER BY created_at ASC, id ASC \
             LIMIT ?"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Pending.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Atomically move a pending job to processing and bump `attempts`.
    ///
    /// Returns `false` if the job does not exist or is no longer pending;
    /// the two cases are deliberately indistinguishable.
    pub async fn claim(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = ?, attempts = attempts + 1, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(JobStatus::Processing.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(JobStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a processing job as completed. Repeating the call is harmless.
    ///
    /// Returns `false` for a job that is pending or failed.
    pub async fn complete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?, updated_at = ? \
             WHERE id = ? AND status IN (?, ?)",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(JobStatus::Processing.as_str())
        .bind(JobStatus::Completed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job as permanently failed, recording `reason`.
    ///
    /// A completed or failed job is left untouched; returns `false` then.
    pub async fn fail(pool: &SqlitePool, id: DbId, reason: &str) -> Result<bool, sqlx::Error> {
        Self::set_outcome(pool, id, JobStatus::Failed, reason).await
    }

    /// Return a job to the queue, recording `reason`. `attempts` is unchanged.
    ///
    /// A completed or failed job is left untouched; returns `false` then.
    pub async fn retry(pool: &SqlitePool, id: DbId, reason: &str) -> Result<bool, sqlx::Error> {
        Self::set_outcome(pool, id, JobStatus::Pending, reason).await
    }

    /// Reset every processing job to pending after an unclean shutdown.
    ///
    /// Returns the number of jobs recovered.
    pub async fn recover_stale(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?, error = ?, updated_at = ? WHERE status = ?",
        )
        .bind(JobStatus::Pending.as_str())
        .bind(RECOVERY_MARKER)
        .bind(Utc::now())
        .bind(JobStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Number of jobs in each status. Statuses with no jobs are omitted.
    pub async fn count_by_status(
        pool: &SqlitePool,
    ) -> Result<Vec<(JobStatus, i64)>, sqlx::Error> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status")
                .fetch_all(pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                status
                    .parse::<JobStatus>()
                    .map(|s| (s, count))
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))
            })
            .collect()
    }

    /// Shared update for `fail` and `retry`: new status plus error text,
    /// never applied to a terminal job.
    async fn set_outcome(
        pool: &SqlitePool,
        id: DbId,
        status: JobStatus,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?, error = ?, updated_at = ? \
             WHERE id = ? AND status NOT IN (?, ?)",
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .bind(JobStatus::Completed.as_str())
        .bind(JobStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
