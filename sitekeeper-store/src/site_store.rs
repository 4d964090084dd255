//! Site store: sites laid out under one root directory.
//!
//! Like the theme store it keeps no in-memory index. A site exists exactly
//! when `<root>/<id>/` exists, and its config is read back from
//! `<root>/<id>/config.toml` on every lookup.
//!
//! # Creation
//!
//! Everything is assembled in a hidden `.staging-*` directory inside the
//! root and promoted with one rename:
//!
//! ```text
//! <root>/.staging-XXXX/<id>.toml      config written (0600)
//! <root>/.staging-XXXX/<id>/          scaffolded by the engine
//! <root>/.staging-XXXX/<id>/hugo.*     engine defaults deleted
//! <root>/.staging-XXXX/<id>/config.toml <id>.toml moved in
//! <root>/<id>/                        rename
//! ```
//!
//! Dropping the staging directory removes whatever was left, so a failed or
//! cancelled create leaves the root as it found it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sitekeeper_core::{
    config,
    paths::{self, SITE_STAGING_PREFIX},
    ConfigError, ConfigFile, Lookup, NewSite, SiteConfig, SiteId, SiteLayout,
};
use sitekeeper_runner::HugoEngine;

use crate::error::{io_err, StoreError};
use crate::locks::KeyedLocks;
use crate::site::{BuildReport, RenderReport, Site};
use crate::theme_store::ThemeStore;

/// Config files the engine may write while scaffolding. It prefers `hugo.*`
/// over `config.toml`, so any of these would shadow the persisted config.
const ENGINE_CONFIG_FILES: &[&str] = &[
    "hugo.toml",
    "hugo.yaml",
    "hugo.yml",
    "hugo.json",
    "config.toml",
    "config.yaml",
    "config.yml",
    "config.json",
];

#[derive(Debug)]
pub struct SiteStore {
    root: PathBuf,
    themes: Arc<ThemeStore>,
    engine: HugoEngine,
    locks: KeyedLocks,
}

impl SiteStore {
    /// Open the store at `root`, creating it (mode `0700`) if needed.
    pub fn open(root: impl Into<PathBuf>, themes: Arc<ThemeStore>, engine: HugoEngine) -> Self {
        let store = Self {
            root: root.into(),
            themes,
            engine,
            locks: KeyedLocks::new(),
        };
        tracing::info!(root = %store.root.display(), "initializing site store");
        if let Err(err) = paths::ensure_store_root(&store.root) {
            tracing::warn!(error = %err, "site store root could not be created");
        }
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn themes(&self) -> &ThemeStore {
        &self.themes
    }

    /// Create a site: resolve its theme, persist its config, scaffold it.
    ///
    /// Either a fully usable site exists afterwards or nothing of it does.
    pub async fn create(
        &self,
        request: NewSite,
        cancel: &CancellationToken,
    ) -> Result<Site, StoreError> {
        let id = request.id.clone();
        let _guard = self.locks.lock(id.as_str()).await;

        let site_root = paths::site_dir(&self.root, &id);
        if fs::symlink_metadata(&site_root).is_ok() {
            return Err(StoreError::SiteExists {
                id,
                path: site_root,
            });
        }
        tracing::info!(site = %id, theme = %request.theme, "creating site");

        let theme = self
            .themes
            .resolve(&request.theme, request.theme_url.as_deref(), cancel)
            .await?;
        tracing::debug!(site = %id, theme = %theme.name, path = %theme.path.display(), "theme ready");

        paths::ensure_store_root(&self.root)?;
        let site = SiteConfig::from_request(request, site_root.clone(), self.themes.root());

        let staging = tempfile::Builder::new()
            .prefix(SITE_STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| io_err(&self.root, e))?;

        let staged_config = paths::staged_config_path(staging.path(), &id);
        config::save_at(&staged_config, &ConfigFile::from_site(&site))?;

        let output = self
            .engine
            .scaffold(&staged_config, &id, staging.path(), cancel)
            .await?;
        if !output.success() {
            tracing::error!(site = %id, status = ?output.status, "{}", output.stderr.trim_end());
            return Err(StoreError::Engine {
                operation: "scaffold",
                site: id,
                status: output.status,
                stderr: output.stderr,
            });
        }

        let staged_site = staging.path().join(id.as_str());
        if !staged_site.is_dir() {
            return Err(StoreError::Engine {
                operation: "scaffold",
                site: id,
                status: output.status,
                stderr: format!("engine did not create {}", staged_site.display()),
            });
        }

        remove_engine_configs(&staged_site)?;
        let config_path = paths::site_config_path(&staged_site);
        fs::rename(&staged_config, &config_path).map_err(|e| io_err(&config_path, e))?;

        for dir in [
            SiteLayout::CONTENT_DIR,
            SiteLayout::LAYOUT_DIR,
            SiteLayout::PUBLISH_DIR,
        ] {
            let dir = staged_site.join(dir);
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        paths::set_dir_permissions(&staged_site)?;

        if let Err(err) = fs::rename(&staged_site, &site_root) {
            if site_root.exists() {
                return Err(StoreError::SiteExists {
                    id,
                    path: site_root,
                });
            }
            return Err(io_err(&site_root, err));
        }
        drop(staging);

        tracing::info!(site = %id, root = %site_root.display(), "site created");
        Ok(Site::new(site, self.engine.clone()))
    }

    /// Reconstruct site `id` from disk.
    pub async fn find(&self, id: &SiteId) -> Lookup<Site> {
        let _guard = self.locks.lock(id.as_str()).await;
        self.find_unlocked(id)
    }

    fn find_unlocked(&self, id: &SiteId) -> Lookup<Site> {
        let dir = paths::site_dir(&self.root, id);
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                tracing::warn!(site = %id, path = %dir.display(), "site path is not a directory");
                return Lookup::Corrupt(format!("{} is not a directory", dir.display()));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Lookup::NotFound,
            Err(err) => {
                tracing::warn!(site = %id, error = %err, "site directory unreadable");
                return Lookup::Unreadable(format!("{}: {err}", dir.display()));
            }
        }

        let config_path = paths::site_config_path(&dir);
        match config::load_at(&config_path) {
            Ok(file) => {
                let site = file.into_site(id.clone(), dir, self.themes.root());
                Lookup::Found(Site::new(site, self.engine.clone()))
            }
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::warn!(site = %id, path = %config_path.display(), "site has no config file");
                Lookup::Corrupt(format!("missing {}", config_path.display()))
            }
            Err(err @ ConfigError::Io { .. }) => {
                tracing::warn!(site = %id, error = %err, "site config unreadable");
                Lookup::Unreadable(err.to_string())
            }
            Err(err) => {
                tracing::warn!(site = %id, error = %err, "site config corrupt");
                Lookup::Corrupt(err.to_string())
            }
        }
    }

    /// IDs of every site directory under the root, sorted.
    pub fn list(&self) -> Result<Vec<SiteId>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_err(&self.root, err)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            if paths::is_hidden(name) || !entry.path().is_dir() {
                continue;
            }
            match SiteId::new(name) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::debug!(entry = %entry.path().display(), "skipping non-site entry"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Build site `id`, holding its lock for the duration.
    pub async fn build(
        &self,
        id: &SiteId,
        cancel: &CancellationToken,
    ) -> Result<BuildReport, StoreError> {
        let _guard = self.locks.lock(id.as_str()).await;
        self.require(id)?.build(cancel).await
    }

    /// Render site `id`, building first if nothing is published yet.
    pub async fn render(
        &self,
        id: &SiteId,
        cancel: &CancellationToken,
    ) -> Result<RenderReport, StoreError> {
        let _guard = self.locks.lock(id.as_str()).await;
        self.require(id)?.render(cancel).await
    }

    fn require(&self, id: &SiteId) -> Result<Site, StoreError> {
        match self.find_unlocked(id) {
            Lookup::Found(site) => Ok(site),
            Lookup::NotFound => Err(StoreError::SiteNotFound { id: id.clone() }),
            Lookup::Corrupt(detail) | Lookup::Unreadable(detail) => Err(StoreError::SiteUnavailable {
                id: id.clone(),
                detail,
            }),
        }
    }
}

/// Drop the engine's own default config from a freshly scaffolded site.
fn remove_engine_configs(site_dir: &Path) -> Result<(), StoreError> {
    for name in ENGINE_CONFIG_FILES {
        let path = site_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed engine default config"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&path, err)),
        }
    }
    Ok(())
}
