//! Polling worker that drives pending jobs through their processors.
//!
//! One long-lived Tokio task. Every `poll_interval` it fetches the oldest
//! pending jobs and handles them one at a time: match a processor, claim,
//! execute, record the outcome. Cycles never overlap because each one is
//! awaited inside the loop.

use std::sync::Arc;
use std::time::Duration;

use catcher_core::job::{can_retry, NO_PROCESSOR_REASON};
use catcher_core::processing::{ProcessError, ProcessRequest, ProcessorRegistry};
use catcher_db::models::job::Job;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::service::JobService;

/// Default polling interval for the worker loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of executions a job gets before it is failed for good.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pending jobs fetched per cycle.
const DEFAULT_BATCH_SIZE: i64 = 10;

/// Tuning knobs for [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    /// A failed execution is retried while `attempts < max_retries`.
    pub max_retries: u32,
    pub batch_size: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What happened to a single job during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Execution failed and the job went back to `pending`.
    Retried,
    /// Execution failed with no retries left.
    Failed,
    /// No processor matches the URL; failed without being claimed.
    Unmatched,
    /// Someone else claimed the job first.
    Skipped,
    /// Shutdown killed the command; the job stays `processing` until the
    /// next start requeues it.
    Interrupted,
}

/// Tally of one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub unmatched: usize,
    pub skipped: usize,
    pub interrupted: usize,
    /// Jobs abandoned because of a storage error.
    pub errored: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: Option<JobOutcome>) {
        match outcome {
            Some(JobOutcome::Completed) => self.completed += 1,
            Some(JobOutcome::Retried) => self.retried += 1,
            Some(JobOutcome::Failed) => self.failed += 1,
            Some(JobOutcome::Unmatched) => self.unmatched += 1,
            Some(JobOutcome::Skipped) => self.skipped += 1,
            Some(JobOutcome::Interrupted) => self.interrupted += 1,
            None => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed
            + self.retried
            + self.failed
            + self.unmatched
            + self.skipped
            + self.interrupted
            + self.errored
    }
}

/// Background job worker.
pub struct Worker {
    service: JobService,
    registry: Arc<ProcessorRegistry>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(service: JobService, registry: Arc<ProcessorRegistry>, config: WorkerConfig) -> Self {
        Self {
            service,
            registry,
            config,
        }
    }

    /// Run the worker loop until the cancellation token is triggered.
    ///
    /// Cancellation is observed between cycles and between jobs. A running
    /// command receives the same token and is killed; its job is left
    /// `processing` for [`JobService::recover_stale`] at the next start.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_retries = self.config.max_retries,
            processors = self.registry.len(),
            "Job worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once(&cancel).await;
                }
            }
        }
    }

    /// One poll cycle: fetch a batch of pending jobs and handle them in order.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::default();

        let jobs = match self.service.get_pending(self.config.batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch pending jobs");
                return report;
            }
        };

        for job in &jobs {
            if cancel.is_cancelled() {
                break;
            }
            report.record(self.process_job(job, cancel).await);
        }

        if report.total() > 0 {
            tracing::debug!(?report, "Poll cycle finished");
        }
        report
    }

    /// Handle one job. `None` means a storage error abandoned it for this cycle.
    async fn process_job(&self, job: &Job, cancel: &CancellationToken) -> Option<JobOutcome> {
        let Some(processor) = self.registry.find(&job.url) else {
            tracing::warn!(job_id = job.id, url = %job.url, "No processor for URL");
            if let Err(e) = self.service.mark_failed(job.id, NO_PROCESSOR_REASON).await {
                tracing::error!(job_id = job.id, error = %e, "Failed to mark job failed");
                return None;
            }
            return Some(JobOutcome::Unmatched);
        };

        match self.service.mark_processing(job.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(job_id = job.id, "Job already claimed, skipping");
                return Some(JobOutcome::Skipped);
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to claim job");
                return None;
            }
        }

        // The fetched copy predates the claim; reload for the new attempt count.
        let job = match self.service.get(job.id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to reload claimed job");
                return None;
            }
        };

        tracing::info!(
            job_id = job.id,
            processor = %processor.name(),
            attempt = job.attempts,
            url = %job.url,
            "Processing job",
        );

        let request = ProcessRequest {
            job_id: job.id,
            url: job.url.clone(),
        };

        match processor.process(&request, cancel).await {
            Ok(()) => {
                if let Err(e) = self.service.mark_complete(job.id).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to mark job complete");
                    return None;
                }
                tracing::info!(
                    job_id = job.id,
                    processor = %processor.name(),
                    url = %job.url,
                    "Job completed",
                );
                Some(JobOutcome::Completed)
            }
            Err(ProcessError::Cancelled { command }) => {
                tracing::warn!(
                    job_id = job.id,
                    command = %command,
                    "Job interrupted by shutdown, leaving it for recovery",
                );
                Some(JobOutcome::Interrupted)
            }
            Err(process_err) => {
                let reason = process_err.to_string();
                if can_retry(job.attempts, job.status, self.config.max_retries) {
                    tracing::warn!(
                        job_id = job.id,
                        attempt = job.attempts,
                        max_retries = self.config.max_retries,
                        error = %reason,
                        "Job failed, will retry",
                    );
                    if let Err(e) = self.service.mark_retry(job.id, &reason).await {
                        tracing::error!(job_id = job.id, error = %e, "Failed to requeue job");
                        return None;
                    }
                    Some(JobOutcome::Retried)
                } else {
                    tracing::error!(
                        job_id = job.id,
                        attempt = job.attempts,
                        error = %reason,
                        "Job failed permanently",
                    );
                    if let Err(e) = self.service.mark_failed(job.id, &reason).await {
                        tracing::error!(job_id = job.id, error = %e, "Failed to mark job failed");
                        return None;
                    }
                    Some(JobOutcome::Failed)
                }
            }
        }
    }
}
