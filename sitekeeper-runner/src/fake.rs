//! In-memory [`CommandRunner`] for tests.
//!
//! [`FakeRunner::hugo_and_git`] simulates the filesystem effects of the build
//! engine (`hugo`) and fetch tool (`git`) closely enough for the stores:
//!
//! - `git clone <url> <dest>` creates `<dest>/theme.toml`; URLs containing
//!   `missing` fail with exit 128.
//! - `hugo new site <id> --config <path>` creates `<cwd>/<id>/archetypes/`;
//!   fails if the config file does not exist.
//! - `hugo` writes `public/index.html` and one post; fails without
//!   `config.toml` in the working directory.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RunnerError;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

type Handler = Box<dyn Fn(&Invocation) -> CommandOutput + Send + Sync>;

pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    handler: Handler,
    delay: Option<Duration>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&Invocation) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            delay: None,
        }
    }

    /// Every invocation succeeds without touching the filesystem.
    pub fn succeeding() -> Self {
        Self::new(|_| CommandOutput::ok(""))
    }

    /// Simulates `hugo` and `git`; see the module docs.
    pub fn hugo_and_git() -> Self {
        Self::new(simulate)
    }

    /// Sleep before answering each invocation, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| inv.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(invocation.clone());
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RunnerError::Cancelled { program: invocation.program.clone() });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled {
                program: invocation.program.clone(),
            });
        }
        Ok((self.handler)(invocation))
    }
}

/// Default behaviour of [`FakeRunner::hugo_and_git`], reusable from custom handlers.
pub fn simulate(inv: &Invocation) -> CommandOutput {
    let args = inv.args_lossy();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match (inv.program.as_str(), args.as_slice()) {
        ("git", ["clone", url, dest]) => {
            if url.contains("missing") {
                return CommandOutput::failed(128, "fatal: repository not found\n");
            }
            let dest = inv.working_dir.join(dest);
            write(&dest.join("theme.toml"), "name = \"fake\"\n")
        }
        ("hugo", ["new", "site", id, "--config", config]) => {
            if !inv.working_dir.join(config).is_file() {
                return CommandOutput::failed(255, "Error: config file not found\n");
            }
            let site = inv.working_dir.join(id);
            write(&site.join("archetypes").join("default.md"), "+++\n+++\n")
        }
        ("hugo", []) => {
            if !inv.working_dir.join("config.toml").is_file() {
                return CommandOutput::failed(255, "Error: Unable to locate config file\n");
            }
            let public = inv.working_dir.join("public");
            let index = write(&public.join("index.html"), "<html>home</html>");
            if !index.success() {
                return index;
            }
            write(
                &public.join("posts").join("first").join("index.html"),
                "<html>first</html>",
            )
        }
        (program, _) => CommandOutput::failed(127, format!("{program}: command not found\n")),
    }
}

fn write(path: &Path, contents: &str) -> CommandOutput {
    let result = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, contents));
    match result {
        Ok(()) => CommandOutput::ok(format!("wrote {}\n", path.display())),
        Err(err) => CommandOutput::failed(1, format!("{}: {err}\n", path.display())),
    }
}
