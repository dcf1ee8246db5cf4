//! The process execution boundary.
//!
//! Install hooks never spawn processes directly; they go through a
//! [`CommandRunner`] so tests can script exit codes and the production
//! implementation can kill a running installer when the run is cancelled.

use std::path::Path;
use std::process::Stdio;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::download::BoxFuture;

use super::error::HookError;

/// Captured result of running an external program.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the program exited successfully.
    pub success: bool,
    /// Exit code, or -1 if the process was killed by a signal.
    pub code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs an external program and captures its exit status and output.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally in `cwd`.
    ///
    /// Must return [`HookError::Cancelled`] and terminate the child when
    /// the token fires mid-run.
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cwd: Option<&'a Path>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CommandOutput, HookError>>;
}

/// Production runner backed by `tokio::process`.
///
/// Children are spawned with `kill_on_drop`, so abandoning the wait on
/// cancellation also terminates the process.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cwd: Option<&'a Path>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CommandOutput, HookError>> {
        Box::pin(async move {
            debug!(program, ?args, "spawning");

            let mut command = tokio::process::Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(cwd) = cwd {
                command.current_dir(cwd);
            }

            let child = command.spawn().map_err(|e| HookError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

            let output = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    // Dropping the wait future kills the child (kill_on_drop)
                    return Err(HookError::Cancelled);
                }

                output = child.wait_with_output() => {
                    output.map_err(|e| HookError::Spawn {
                        program: program.to_string(),
                        source: e,
                    })?
                }
            };

            Ok(CommandOutput {
                success: output.status.success(),
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(
                "echo",
                &["hello".to_string()],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(
                "sh",
                &["-c".to_string(), "exit 3".to_string()],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.code, 3);
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let runner = ProcessRunner::new();
        let result = runner
            .run(
                "definitely-not-a-real-program",
                &[],
                None,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(HookError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_run_cancelled_mid_flight() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            runner.run(
                "sleep",
                &["30".to_string()],
                None,
                &cancel,
            ),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(HookError::Cancelled)));
    }
}
