//! External process capability and its tokio-backed implementation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use sitekeeper_core::Settings;

use crate::error::RunnerError;

/// One external command: program, arguments, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Arguments as UTF-8 (lossy), for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs an [`Invocation`] to completion or until `cancel` fires.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError>;
}

/// Real subprocesses via `tokio::process`.
///
/// At most `max_jobs` processes run at once across every clone of the runner.
/// A child is killed when its invocation times out, is cancelled, or its
/// future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    jobs: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(max_jobs: usize, timeout: Option<Duration>) -> Self {
        Self {
            jobs: Arc::new(Semaphore::new(max_jobs.max(1))),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_concurrent_jobs, settings.command_timeout())
    }

    /// Permits currently free; equals `max_jobs` when idle.
    pub fn available_jobs(&self) -> usize {
        self.jobs.available_permits()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError> {
        let program = invocation.program.clone();

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunnerError::Cancelled { program }),
            permit = self.jobs.clone().acquire_owned() => {
                permit.map_err(|_| RunnerError::Closed)?
            }
        };

        tracing::debug!(
            program = %program,
            args = ?invocation.args_lossy(),
            cwd = %invocation.working_dir.display(),
            "spawning external command",
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: program.clone(),
                source,
            })?;

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Losing branches drop `wait_with_output`, which owns the child and kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| RunnerError::Wait {
                program: program.clone(),
                source,
            })?,
            _ = cancel.cancelled() => {
                tracing::warn!(program = %program, "external command cancelled");
                return Err(RunnerError::Cancelled { program });
            }
            _ = deadline => {
                let timeout = self.timeout.unwrap_or_default();
                tracing::warn!(program = %program, ?timeout, "external command timed out");
                return Err(RunnerError::TimedOut { program, timeout });
            }
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn sh(script: &str, cwd: &std::path::Path) -> Invocation {
        Invocation::new("sh", cwd).arg("-c").arg(script)
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr_separately() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(2, None);
        let out = runner
            .run(&sh("echo out; echo err >&2", dir.path()), &CancellationToken::new())
            .await
            .expect("run");
        assert!(out.success());
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_output_not_error() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, None);
        let out = runner
            .run(&sh("echo boom >&2; exit 3", dir.path()), &CancellationToken::new())
            .await
            .expect("run");
        assert!(!out.success());
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stderr, "boom\n");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, None);
        runner
            .run(&sh("touch marker", dir.path()), &CancellationToken::new())
            .await
            .expect("run");
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, None);
        let err = runner
            .run(
                &Invocation::new("sitekeeper-no-such-program", dir.path()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn timeout_kills_long_running_child() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, Some(Duration::from_millis(100)));
        let started = Instant::now();
        let err = runner
            .run(&sh("sleep 30", dir.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::TimedOut { .. }), "got: {err}");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(runner.available_jobs(), 1, "permit released after timeout");
    }

    #[tokio::test]
    async fn cancellation_stops_child() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = runner
            .run(&sh("sleep 30", dir.path()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Cancelled { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn already_cancelled_never_spawns() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .run(&sh("touch marker", dir.path()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Cancelled { .. }));
        assert!(!dir.path().join("marker").exists());
    }
}
