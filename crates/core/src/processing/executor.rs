//! Unified processor interface and shared types.
//!
//! Defines [`UrlProcessor`], the capability every configured handler
//! provides, along with [`ProcessRequest`] and [`ProcessError`].

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::DbId;

/// The slice of a job a processor needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Job id, used to scope the isolated working directory.
    pub job_id: DbId,
    /// The submitted URL, substituted for `{url}` in argument templates.
    pub url: String,
}

/// Errors that can occur while processing a job.
///
/// The worker never propagates these: the [`Display`](fmt::Display) text is
/// recorded as the job's `error` field.
#[derive(Debug)]
pub enum ProcessError {
    /// The command could not be launched (missing binary, permissions).
    Spawn {
        command: String,
        source: std::io::Error,
    },
    /// The command ran and exited unsuccessfully.
    CommandFailed {
        command: String,
        /// Human-readable exit status (e.g. `exit status: 1`).
        status: String,
        /// Captured stdout followed by stderr.
        output: String,
    },
    /// Shutdown was requested while the command was running; it was killed.
    Cancelled { command: String },
    /// The working or target directory could not be prepared.
    Workspace(std::io::Error),
    /// Produced files could not be moved into the target directory.
    Relocate(std::io::Error),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { command, source } => write!(f, "{command} failed to start: {source}"),
            Self::CommandFailed {
                command,
                status,
                output,
            } => {
                if output.is_empty() {
                    write!(f, "{command} failed: {status}")
                } else {
                    write!(f, "{command} failed: {status}: {output}")
                }
            }
            Self::Cancelled { command } => write!(f, "{command} interrupted by shutdown"),
            Self::Workspace(err) => write!(f, "prepare directory: {err}"),
            Self::Relocate(err) => write!(f, "move files: {err}"),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Workspace(err) | Self::Relocate(err) => Some(err),
            _ => None,
        }
    }
}

/// A configured URL-pattern-to-command binding.
///
/// Object safe so the registry can hold an ordered list of
/// `Arc<dyn UrlProcessor>`.
#[async_trait]
pub trait UrlProcessor: Send + Sync {
    /// Configured processor name, used in logs.
    fn name(&self) -> &str;

    /// Directory finished output ends up in.
    fn target_dir(&self) -> &Path;

    /// Whether this processor handles `url`.
    fn matches(&self, url: &str) -> bool;

    /// Run the processor for one job. Honors `cancel` on a best-effort basis.
    async fn process(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_command_failed_includes_output() {
        let err = ProcessError::CommandFailed {
            command: "yt-dlp".to_string(),
            status: "exit status: 1".to_string(),
            output: "ERROR: unsupported URL".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "yt-dlp failed: exit status: 1: ERROR: unsupported URL"
        );
    }

    #[test]
    fn display_command_failed_without_output() {
        let err = ProcessError::CommandFailed {
            command: "false".to_string(),
            status: "exit status: 1".to_string(),
            output: String::new(),
        };
        assert_eq!(err.to_string(), "false failed: exit status: 1");
    }

    #[test]
    fn display_cancelled() {
        let err = ProcessError::Cancelled {
            command: "sleep".to_string(),
        };
        assert_eq!(err.to_string(), "sleep interrupted by shutdown");
    }

    #[test]
    fn spawn_error_has_source() {
        let err = ProcessError::Spawn {
            command: "missing".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("missing failed to start:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn cancelled_has_no_source() {
        let err = ProcessError::Cancelled {
            command: "sleep".to_string(),
        };
        assert!(std::error::Error::source(&err).is_none());
    }
}
