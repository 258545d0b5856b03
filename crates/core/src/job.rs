//! Job lifecycle vocabulary shared by the store, the worker and the API.
//!
//! A job moves `pending -> processing -> completed | pending | failed`.
//! The store enforces the transitions; this module only names the states and
//! holds the pure rules (retry eligibility, URL acceptance).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::ValidateUrl;

use crate::error::CoreError;

/// Error recorded on jobs reset by startup recovery.
pub const RECOVERY_MARKER: &str = "recovered after crash";

/// Error recorded on jobs whose URL matches no configured processor.
pub const NO_PROCESSOR_REASON: &str = "no processor for URL";

/// Processing state of a job, stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// The persisted / wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `true` for states no worker will ever move the job out of.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown job status '{other}'. Must be one of: pending, processing, completed, failed"
            ))),
        }
    }
}

impl TryFrom<String> for JobStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whether a job whose execution just failed goes back to the queue.
///
/// `attempts` is the count after the claim that preceded the failure, so a
/// job gets exactly `max_retries` executions in total.
pub fn can_retry(attempts: i64, status: JobStatus, max_retries: u32) -> bool {
    attempts < i64::from(max_retries) && status != JobStatus::Completed
}

/// Reject anything that is not a well-formed absolute URL.
pub fn validate_url(raw: &str) -> Result<(), CoreError> {
    if raw.trim().is_empty() || !raw.validate_url() {
        return Err(CoreError::InvalidUrl(raw.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
