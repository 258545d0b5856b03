//! Shared subprocess management.
//!
//! Provides [`run_command`], the spawn + capture + cancellation logic used by
//! [`CommandProcessor`](super::CommandProcessor) in both direct and isolated
//! mode. The caller sets the program, arguments and working directory.

use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::executor::ProcessError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output past this limit is still read from the pipe but discarded, so a
/// verbose downloader keeps running instead of dying on a closed pipe.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum size of the output carried by [`ProcessError::CommandFailed`].
///
/// Only the tail is kept; that is where downloaders print the actual error.
pub const MAX_FAILURE_OUTPUT_BYTES: usize = 16 * 1024;

/// Captured result of a successful command run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Stdout followed by stderr, trimmed.
    pub combined: String,
    pub duration_ms: u64,
}

/// Spawn `cmd`, capture its output, and wait for it to exit.
///
/// A non-zero exit becomes [`ProcessError::CommandFailed`] carrying the
/// combined output. If `cancel` fires first the child is killed (it is
/// spawned with `kill_on_drop`) and [`ProcessError::Cancelled`] is returned.
pub async fn run_command(
    cmd: &mut Command,
    program: &str,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ProcessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: program.to_string(),
        source,
    })?;

    // Read both pipes in their own tasks so `child.wait()` can borrow the child.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = tokio::select! {
        waited = child.wait() => waited.map_err(|source| ProcessError::Spawn {
            command: program.to_string(),
            source,
        })?,
        () = cancel.cancelled() => {
            // Returning drops `child`, which kills the process.
            return Err(ProcessError::Cancelled {
                command: program.to_string(),
            });
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let combined = combine_output(&stdout, &stderr);

    if !status.success() {
        return Err(ProcessError::CommandFailed {
            command: program.to_string(),
            status: status.to_string(),
            output: tail(&combined, MAX_FAILURE_OUTPUT_BYTES).to_string(),
        });
    }

    Ok(CommandOutput {
        status,
        combined,
        duration_ms,
    })
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(stderr));
    text.trim().to_string()
}

/// Last `max` bytes of `text`, starting on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].trim_start()
}

/// Read an output stream to EOF, keeping the first [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
        // The pipe stays open until the child closes it.
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let cancel = CancellationToken::new();
        let output = run_command(&mut sh("echo out; echo err >&2"), "sh", &cancel)
            .await
            .expect("run");
        assert!(output.status.success());
        assert!(output.combined.contains("out"));
        assert!(output.combined.contains("err"));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_output() {
        let cancel = CancellationToken::new();
        let result = run_command(&mut sh("echo boom >&2; exit 3"), "sh", &cancel).await;
        assert_matches!(
            result,
            Err(ProcessError::CommandFailed { ref output, .. }) if output == "boom"
        );
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let cancel = CancellationToken::new();
        let mut cmd = Command::new("/nonexistent/catcher-test-binary");
        let result = run_command(&mut cmd, "/nonexistent/catcher-test-binary", &cancel).await;
        assert_matches!(result, Err(ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn cancellation_kills_running_command() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = run_command(&mut sh("sleep 30"), "sh", &cancel).await;

        assert_matches!(result, Err(ProcessError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn runs_in_configured_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cancel = CancellationToken::new();
        let mut cmd = sh("touch marker.txt");
        cmd.current_dir(dir.path());
        run_command(&mut cmd, "sh", &cancel).await.expect("run");
        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn output_past_capture_limit_does_not_break_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cancel = CancellationToken::new();
        let mut cmd = sh("set -e; yes 0123456789 | head -c 12000000; echo done > marker.txt");
        cmd.current_dir(dir.path());

        let output = run_command(&mut cmd, "sh", &cancel).await.expect("run");

        assert!(output.status.success());
        assert!(output.combined.len() <= MAX_OUTPUT_BYTES);
        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn failure_output_keeps_only_the_tail() {
        let cancel = CancellationToken::new();
        let script = "set -e; yes 0123456789 | head -c 12000000; echo last-line >&2; exit 1";

        let result = run_command(&mut sh(script), "sh", &cancel).await;

        let output = assert_matches!(
            result,
            Err(ProcessError::CommandFailed { output, .. }) => output
        );
        assert!(output.len() <= MAX_FAILURE_OUTPUT_BYTES);
        assert!(output.ends_with("last-line"));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail("short", 16), "short");
        assert_eq!(tail("abcdef", 3), "def");
        // "é" is two bytes; cutting inside it moves forward to the next char.
        assert_eq!(tail("aéb", 2), "b");
    }
}
