//! Build engine adapter.
//!
//! | Operation | Command                                   | Working dir   |
//! |-----------|-------------------------------------------|---------------|
//! | scaffold  | `<engine> new site <id> --config <path>`  | staging dir   |
//! | build     | `<engine>`                                | site root     |
//!
//! The build passes no config argument: the engine discovers `config.toml`
//! in its working directory.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sitekeeper_core::SiteId;

use crate::error::RunnerError;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

#[derive(Clone)]
pub struct HugoEngine {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl HugoEngine {
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn scaffold_invocation(
        &self,
        config_path: &Path,
        id: &SiteId,
        working_dir: &Path,
    ) -> Invocation {
        Invocation::new(&self.program, working_dir)
            .arg("new")
            .arg("site")
            .arg(id.as_str())
            .arg("--config")
            .arg(config_path)
    }

    pub fn build_invocation(&self, site_root: &Path) -> Invocation {
        Invocation::new(&self.program, site_root)
    }

    /// Create `<working_dir>/<id>/` from the config at `config_path`.
    pub async fn scaffold(
        &self,
        config_path: &Path,
        id: &SiteId,
        working_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError> {
        let invocation = self.scaffold_invocation(config_path, id, working_dir);
        self.runner.run(&invocation, cancel).await
    }

    /// Build the site rooted at `site_root` into its publish directory.
    pub async fn build(
        &self,
        site_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, RunnerError> {
        self.runner.run(&self.build_invocation(site_root), cancel).await
    }
}

impl std::fmt::Debug for HugoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HugoEngine")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRunner;
    use std::path::PathBuf;

    #[test]
    fn scaffold_invocation_contract() {
        let engine = HugoEngine::new("hugo", Arc::new(FakeRunner::succeeding()));
        let id = SiteId::new("acme").unwrap();
        let inv = engine.scaffold_invocation(
            Path::new("/srv/sites/.staging-1/acme.toml"),
            &id,
            Path::new("/srv/sites/.staging-1"),
        );
        assert_eq!(inv.program, "hugo");
        assert_eq!(
            inv.args_lossy(),
            ["new", "site", "acme", "--config", "/srv/sites/.staging-1/acme.toml"]
        );
        assert_eq!(inv.working_dir, PathBuf::from("/srv/sites/.staging-1"));
    }

    #[test]
    fn build_invocation_has_no_arguments() {
        let engine = HugoEngine::new("/opt/hugo", Arc::new(FakeRunner::succeeding()));
        let inv = engine.build_invocation(Path::new("/srv/sites/acme"));
        assert_eq!(inv.program, "/opt/hugo");
        assert!(inv.args.is_empty());
        assert_eq!(inv.working_dir, PathBuf::from("/srv/sites/acme"));
    }

    #[tokio::test]
    async fn build_goes_through_runner() {
        let runner = Arc::new(FakeRunner::succeeding());
        let engine = HugoEngine::new("hugo", runner.clone());
        let out = engine
            .build(Path::new("/srv/sites/acme"), &CancellationToken::new())
            .await
            .expect("build");
        assert!(out.success());
        assert_eq!(runner.calls().len(), 1);
    }
}
