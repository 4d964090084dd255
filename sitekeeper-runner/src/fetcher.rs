//! Remote theme fetch adapter: `<fetcher> clone <url> <dest>`.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::RunnerError;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

#[derive(Clone)]
pub struct GitFetcher {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl GitFetcher {
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn clone_invocation(&self, url: &str, dest: &Path, working_dir: &Path) -> Invocation {
        Invocation::new(&self.program, working_dir)
            .arg("clone")
            .arg(url)
            .arg(dest)
    }

    /// Populate `dest` with the resource at `url`.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        working_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError> {
        let invocation = self.clone_invocation(url, dest, working_dir);
        self.runner.run(&invocation, cancel).await
    }
}

impl std::fmt::Debug for GitFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitFetcher")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}
