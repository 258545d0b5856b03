//! Processor that runs a configured external command for matching URLs.
//!
//! In isolated mode (the default) the command runs inside a job-scoped temp
//! directory and only its regular files are moved into the target directory
//! after a successful exit. The temp directory is removed on every path out,
//! including failure and cancellation, because it is held by a
//! [`tempfile::TempDir`] guard.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::config::{ProcessorConfig, ProcessorConfigError};
use super::executor::{ProcessError, ProcessRequest, UrlProcessor};
use super::{relocate, subprocess};
use crate::paths;

/// Placeholder substituted with the job URL in argument templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// A URL-pattern-to-command binding.
#[derive(Debug)]
pub struct CommandProcessor {
    name: String,
    pattern: Regex,
    command: String,
    args: Vec<String>,
    target_dir: PathBuf,
    isolate: bool,
}

impl CommandProcessor {
    /// Build a processor, compiling its pattern and applying defaults.
    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ProcessorConfigError> {
        let pattern =
            Regex::new(&config.pattern).map_err(|source| ProcessorConfigError::InvalidPattern {
                name: config.name.clone(),
                pattern: config.pattern.clone(),
                source,
            })?;

        if config.command.trim().is_empty() {
            return Err(ProcessorConfigError::MissingCommand {
                name: config.name.clone(),
            });
        }

        let target_dir = match config.target_dir.as_deref() {
            Some(dir) if !dir.is_empty() => paths::expand_path(dir),
            _ => paths::default_target_dir(),
        };

        Ok(Self {
            name: config.name.clone(),
            pattern,
            command: config.command.clone(),
            args: config.args.clone(),
            target_dir,
            isolate: config.isolate.unwrap_or(true),
        })
    }

    pub fn is_isolated(&self) -> bool {
        self.isolate
    }

    /// Argument list with every `{url}` replaced by `url`.
    pub fn render_args(&self, url: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, url))
            .collect()
    }

    fn command_in(&self, dir: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(args).current_dir(dir);
        cmd
    }

    /// Run straight in the target directory.
    async fn run_direct(
        &self,
        request: &ProcessRequest,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        tokio::fs::create_dir_all(&self.target_dir)
            .await
            .map_err(ProcessError::Workspace)?;

        let mut cmd = self.command_in(&self.target_dir, args);
        let output = subprocess::run_command(&mut cmd, &self.command, cancel).await?;

        tracing::debug!(
            job_id = request.job_id,
            processor = %self.name,
            duration_ms = output.duration_ms,
            "Command finished in target directory",
        );
        Ok(())
    }

    /// Run in a job-scoped temp directory, then move results into place.
    async fn run_isolated(
        &self,
        request: &ProcessRequest,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        let workspace = tempfile::Builder::new()
            .prefix(&format!("catcher-job-{}-", request.job_id))
            .tempdir()
            .map_err(ProcessError::Workspace)?;

        tracing::debug!(
            job_id = request.job_id,
            processor = %self.name,
            dir = %workspace.path().display(),
            "Running isolated",
        );

        let mut cmd = self.command_in(workspace.path(), args);
        let output = subprocess::run_command(&mut cmd, &self.command, cancel).await?;

        let report = relocate::move_files(workspace.path(), &self.target_dir)
            .await
            .map_err(ProcessError::Relocate)?;

        tracing::info!(
            job_id = request.job_id,
            processor = %self.name,
            duration_ms = output.duration_ms,
            moved = ?report.moved,
            skipped = ?report.skipped,
            target_dir = %self.target_dir.display(),
            "Moved command output into target directory",
        );
        Ok(())
    }
}

#[async_trait]
impl UrlProcessor for CommandProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    async fn process(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        let args = self.render_args(&request.url);
        if self.isolate {
            self.run_isolated(request, &args, cancel).await
        } else {
            self.run_direct(request, &args, cancel).await
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
