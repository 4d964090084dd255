//! A managed site: its reconstructed config plus the engine that builds it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use sitekeeper_core::{SiteConfig, SiteId};
use sitekeeper_runner::HugoEngine;

use crate::bundle::{self, Bundle};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct Site {
    config: SiteConfig,
    engine: HugoEngine,
}

/// Outcome of one successful engine build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub site: SiteId,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    /// Present when rendering had to run a build first.
    pub build: Option<BuildReport>,
    /// Published pages, relative to the publish directory, sorted.
    pub pages: Vec<PathBuf>,
}

impl Site {
    pub(crate) fn new(config: SiteConfig, engine: HugoEngine) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn id(&self) -> &SiteId {
        &self.config.id
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn publish_dir(&self) -> &Path {
        &self.config.layout.publish_dir
    }

    pub fn into_config(self) -> SiteConfig {
        self.config
    }

    /// Run the build engine in the site root.
    ///
    /// Takes no lock. Concurrent callers should go through
    /// [`SiteStore::build`](crate::SiteStore::build), which holds the per-site
    /// lock for the whole run.
    pub async fn build(&self, cancel: &CancellationToken) -> Result<BuildReport, StoreError> {
        let started_at = Utc::now();
        tracing::info!(site = %self.id(), root = %self.root().display(), "building site");

        let output = self.engine.build(self.root(), cancel).await?;
        let finished_at = Utc::now();

        if !output.success() {
            tracing::error!(site = %self.id(), status = ?output.status, "{}", output.stderr.trim_end());
            return Err(StoreError::Engine {
                operation: "build",
                site: self.id().clone(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        if !output.stdout.trim().is_empty() {
            tracing::info!(site = %self.id(), "{}", output.stdout.trim_end());
        }

        Ok(BuildReport {
            site: self.id().clone(),
            stdout: output.stdout,
            stderr: output.stderr,
            started_at,
            finished_at,
        })
    }

    /// HTML pages currently in the publish directory, relative and sorted.
    ///
    /// A missing publish directory has no pages.
    pub fn published_pages(&self) -> Result<Vec<PathBuf>, StoreError> {
        let publish = self.publish_dir();
        if !publish.is_dir() {
            return Ok(vec![]);
        }
        let mut pages = Vec::new();
        for entry in WalkDir::new(publish).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(publish).to_path_buf();
                crate::error::io_err(path, e.into())
            })?;
            let is_html = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
            if entry.file_type().is_file() && is_html {
                if let Ok(rel) = entry.path().strip_prefix(publish) {
                    pages.push(rel.to_path_buf());
                }
            }
        }
        pages.sort();
        Ok(pages)
    }

    /// Make sure the publish directory holds rendered pages.
    ///
    /// Builds only when there are none yet; an existing render is reused.
    pub async fn render(&self, cancel: &CancellationToken) -> Result<RenderReport, StoreError> {
        let mut build = None;
        if self.published_pages()?.is_empty() {
            tracing::info!(site = %self.id(), "no published pages, building before render");
            build = Some(self.build(cancel).await?);
        }
        let pages = self.published_pages()?;
        tracing::info!(site = %self.id(), pages = pages.len(), "site rendered");
        Ok(RenderReport { build, pages })
    }

    /// Deterministic `tar.zst` of the publish directory.
    pub fn generate_bundle(&self) -> Result<Bundle, StoreError> {
        let bundle = bundle::archive_dir(self.publish_dir())?;
        tracing::info!(
            site = %self.id(),
            files = bundle.file_count,
            sha256 = %bundle.sha256,
            "bundle generated"
        );
        Ok(bundle)
    }
}
