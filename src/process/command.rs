//! External command execution.
//!
//! Every interaction with the managed server goes through [`ExternalCommand`].
//! A non-zero exit is data, not an error: callers branch on
//! [`ProcessResult::success`]. Spawn failures and deadline expiry are folded
//! into the same result so nothing here can abort a caller's protocol.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

/// Outcome of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    /// Exit status was zero.
    pub success: bool,
    /// Standard output followed by standard error.
    pub output: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// The deadline expired and the process was killed.
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: Some(0),
            timed_out: false,
        }
    }

    pub fn failed(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            success: false,
            output: format!("command timed out after {}s", after.as_secs()),
            exit_code: None,
            timed_out: true,
        }
    }

    fn spawn_failed(err: &std::io::Error) -> Self {
        Self {
            success: false,
            output: err.to_string(),
            exit_code: None,
            timed_out: false,
        }
    }
}

/// Result of validating a candidate configuration.
pub type ValidationResult = ProcessResult;

/// Capability to run one fixed program with varying arguments.
#[async_trait]
pub trait ExternalCommand: Send + Sync {
    async fn run(&self, args: &[String]) -> ProcessResult;
}

/// Runs a real executable with a deadline.
#[derive(Debug, Clone)]
pub struct SystemCommand {
    program: PathBuf,
    timeout: Duration,
}

impl SystemCommand {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ExternalCommand for SystemCommand {
    async fn run(&self, args: &[String]) -> ProcessResult {
        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = ?self.program, ?args, error = %e, "Failed to spawn command");
                return ProcessResult::spawn_failed(&e);
            }
        };

        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                ProcessResult {
                    success: out.status.success(),
                    output,
                    exit_code: out.status.code(),
                    timed_out: false,
                }
            }
            Ok(Err(e)) => ProcessResult::spawn_failed(&e),
            // Dropping the wait future drops the child, which kills it.
            Err(_) => ProcessResult::timeout(self.timeout),
        };

        tracing::debug!(
            program = ?self.program,
            ?args,
            success = result.success,
            timed_out = result.timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_a_failed_result() {
        let cmd = SystemCommand::new("/nonexistent/nginx-admin-test-binary", Duration::from_secs(1));
        let result = cmd.run(&["-t".to_string()]).await;
        assert!(!result.success);
        assert!(!result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(!result.output.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let cmd = SystemCommand::new("sh", Duration::from_secs(5));
        let result = cmd
            .run(&["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()])
            .await;
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_expiry() {
        let cmd = SystemCommand::new("sleep", Duration::from_millis(100));
        let result = cmd.run(&["5".to_string()]).await;
        assert!(result.timed_out);
        assert!(!result.success);
    }
}
