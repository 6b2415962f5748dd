//! Cloud CLI command runner.
//!
//! Every adapter call that shells out goes through here. Children run on the
//! tokio process driver so a slow CLI never stalls the scheduler.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{OpsError, Result};

/// Default timeout for a single CLI invocation.
pub const CLI_TIMEOUT: Duration = Duration::from_secs(15);

/// Longer bound for billing queries, which scan exported tables.
pub const BILLING_TIMEOUT: Duration = Duration::from_secs(60);

/// Output from a CLI command.
#[derive(Debug)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    /// Check if command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Up to `max` characters of trimmed stdout, for status debug output.
    #[must_use]
    pub fn stdout_excerpt(&self, max: usize) -> String {
        self.stdout.trim().chars().take(max).collect()
    }

    /// Up to `max` characters of trimmed stderr.
    #[must_use]
    pub fn stderr_excerpt(&self, max: usize) -> String {
        self.stderr.trim().chars().take(max).collect()
    }
}

/// Resolve a CLI binary on PATH without blocking the scheduler.
pub async fn locate(program: &str) -> Option<PathBuf> {
    let program = program.to_string();
    tokio::task::spawn_blocking(move || which::which(program).ok())
        .await
        .ok()
        .flatten()
}

/// Run a CLI command with timeout.
///
/// `PAGER` is removed from the child environment so CLIs never wait on an
/// interactive pager. The child is killed if the future is dropped.
///
/// # Errors
///
/// Returns error if:
/// - Command not found (`CliNotFound`)
/// - Command times out (`Timeout`)
/// - Command fails to execute (`AdapterCall`)
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout_duration: Duration,
) -> Result<CliOutput> {
    tracing::debug!(program, args = ?args, "Running CLI command");

    let mut child = Command::new(program)
        .args(args)
        .env_remove("PAGER")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpsError::CliNotFound {
                    name: program.to_string(),
                }
            } else {
                OpsError::AdapterCall {
                    provider: program.to_string(),
                    operation: "spawn".to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let result = timeout(timeout_duration, async {
        // Drain both pipes together so a full stderr buffer cannot block stdout.
        let stdout_handle = async move {
            let mut stdout = String::new();
            if let Some(mut out) = stdout_pipe {
                out.read_to_string(&mut stdout).await?;
            }
            Ok::<_, std::io::Error>(stdout)
        };

        let stderr_handle = async move {
            let mut stderr = String::new();
            if let Some(mut err) = stderr_pipe {
                err.read_to_string(&mut stderr).await?;
            }
            Ok::<_, std::io::Error>(stderr)
        };

        let (stdout_result, stderr_result) = tokio::join!(stdout_handle, stderr_handle);
        let stdout = stdout_result?;
        let stderr = stderr_result?;

        let status = child.wait().await?;

        Ok::<_, std::io::Error>(CliOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    })
    .await;

    match result {
        Ok(Ok(output)) => {
            tracing::debug!(
                program,
                exit_code = output.exit_code,
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "CLI command finished"
            );
            Ok(output)
        }
        Ok(Err(e)) => Err(OpsError::AdapterCall {
            provider: program.to_string(),
            operation: "read output".to_string(),
            reason: e.to_string(),
        }),
        Err(_) => {
            tracing::warn!(program, timeout_secs = timeout_duration.as_secs(), "CLI command timed out");
            let _ = child.kill().await;
            let _ = child.wait().await;
            Err(OpsError::Timeout {
                provider: program.to_string(),
                seconds: timeout_duration.as_secs(),
            })
        }
    }
}

/// Run a CLI command and parse JSON output.
///
/// # Errors
///
/// Returns `CliFailed` on a non-zero exit, `ParseResponse` if stdout is not
/// valid JSON for `T`, or any error from [`run_command`].
pub async fn run_json_command<T: serde::de::DeserializeOwned>(
    program: &str,
    args: &[&str],
    timeout_duration: Duration,
) -> Result<T> {
    let output = run_command(program, args, timeout_duration).await?;

    if !output.success() {
        return Err(OpsError::CliFailed {
            program: program.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr_excerpt(300),
        });
    }

    parse_json_output(&output.stdout)
}

/// Parse CLI stdout as JSON. Empty output parses as JSON `null`.
///
/// # Errors
///
/// Returns `ParseResponse` with a short excerpt of the offending output.
pub fn parse_json_output<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<T> {
    let trimmed = stdout.trim();
    let raw = if trimmed.is_empty() { "null" } else { trimmed };
    serde_json::from_str(raw).map_err(|e| {
        OpsError::ParseResponse(format!(
            "{}: {}",
            e,
            raw.chars().take(200).collect::<String>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_maps_to_cli_not_found() {
        let err = run_command("opsyield-definitely-missing-cli", &[], CLI_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::CliNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = run_command("sh", &["-c", "echo hello; echo oops >&2; exit 3"], CLI_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr_excerpt(10), "oops");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pager_is_removed_from_child_env() {
        let output = run_command("sh", &["-c", "echo \"${PAGER:-unset}\""], CLI_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "unset");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_command("sleep", &["5"], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_cli_failed_for_json() {
        let err = run_json_command::<serde_json::Value>("sh", &["-c", "exit 1"], CLI_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::CliFailed { exit_code: 1, .. }));
    }

    #[tokio::test]
    async fn locate_missing_binary_is_none() {
        assert!(locate("opsyield-definitely-missing-cli").await.is_none());
    }

    #[test]
    fn parse_json_output_handles_empty_and_garbage() {
        let value: Option<serde_json::Value> = parse_json_output("  ").unwrap();
        assert!(value.is_none());
        let err = parse_json_output::<serde_json::Value>("not json").unwrap_err();
        assert!(matches!(err, OpsError::ParseResponse(_)));
    }
}
