//! Theme store: themes present under one root directory.
//!
//! There is no in-memory theme map. Every query looks at the filesystem, so
//! themes added or removed out-of-band are seen immediately.
//!
//! A fetch clones into a hidden `.fetch-*` directory inside the root and
//! renames the result into place, so a failed or cancelled fetch never leaves
//! a partial theme behind.

use std::fs;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use sitekeeper_core::{
    paths::{self, THEME_STAGING_PREFIX},
    Lookup, Theme, ThemeName,
};
use sitekeeper_runner::GitFetcher;

use crate::error::{io_err, StoreError};
use crate::locks::KeyedLocks;

#[derive(Debug)]
pub struct ThemeStore {
    root: PathBuf,
    fetcher: GitFetcher,
    locks: KeyedLocks,
}

impl ThemeStore {
    /// Open the store at `root`, creating it (mode `0700`) if needed.
    ///
    /// Failure to create the root is logged, not returned: later operations
    /// report their own errors.
    pub fn open(root: impl Into<PathBuf>, fetcher: GitFetcher) -> Self {
        let store = Self {
            root: root.into(),
            fetcher,
            locks: KeyedLocks::new(),
        };
        tracing::info!(root = %store.root.display(), "initializing theme store");

        if let Err(err) = paths::ensure_store_root(&store.root) {
            tracing::warn!(error = %err, "theme store root could not be created");
        }
        match store.list() {
            Ok(themes) if themes.is_empty() => tracing::info!("no themes found"),
            Ok(themes) => {
                let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
                tracing::info!(count = themes.len(), themes = ?names, "themes available");
            }
            Err(err) => tracing::warn!(error = %err, "theme store root could not be scanned"),
        }
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Is `name` present and usable?
    pub fn find(&self, name: &ThemeName) -> Lookup<Theme> {
        let path = paths::theme_dir(&self.root, name);
        inspect_theme_dir(&path).map(|()| Theme {
            name: name.clone(),
            path,
        })
    }

    /// All usable themes, sorted by name.
    pub fn list(&self) -> Result<Vec<Theme>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_err(&self.root, err)),
        };

        let mut themes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            if paths::is_hidden(name) {
                continue;
            }
            let Ok(name) = ThemeName::new(name) else {
                tracing::debug!(entry = %entry.path().display(), "skipping non-theme entry");
                continue;
            };
            if let Lookup::Found(theme) = self.find(&name) {
                themes.push(theme);
            }
        }
        themes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(themes)
    }

    /// Fetch `name` from `url` into the store.
    ///
    /// Fails with [`StoreError::ThemeExists`] if the theme is already present.
    pub async fn fetch(
        &self,
        name: &ThemeName,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Theme, StoreError> {
        let _guard = self.locks.lock(name.as_str()).await;
        if let Lookup::Found(theme) = self.find(name) {
            return Err(StoreError::ThemeExists {
                theme: name.clone(),
                path: theme.path,
            });
        }
        self.fetch_locked(name, url, cancel).await
    }

    /// Return `name` if present, otherwise fetch it from `url`.
    ///
    /// Concurrent resolutions of one theme fetch at most once.
    pub async fn resolve(
        &self,
        name: &ThemeName,
        url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Theme, StoreError> {
        let _guard = self.locks.lock(name.as_str()).await;
        match self.find(name) {
            Lookup::Found(theme) => Ok(theme),
            Lookup::NotFound => {
                let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
                    tracing::error!(theme = %name, "theme doesn't exist and no URL was given");
                    return Err(StoreError::MissingThemeSource {
                        theme: name.clone(),
                    });
                };
                tracing::info!(theme = %name, url, "theme not found locally, fetching");
                self.fetch_locked(name, url, cancel).await
            }
            Lookup::Corrupt(detail) | Lookup::Unreadable(detail) => {
                Err(StoreError::ThemeUnavailable {
                    theme: name.clone(),
                    detail,
                })
            }
        }
    }

    async fn fetch_locked(
        &self,
        name: &ThemeName,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Theme, StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::MissingThemeSource {
                theme: name.clone(),
            });
        }
        paths::ensure_store_root(&self.root)?;

        let dest = paths::theme_dir(&self.root, name);
        let staging = tempfile::Builder::new()
            .prefix(THEME_STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| io_err(&self.root, e))?;
        let staged = staging.path().join(name.as_str());

        let output = self
            .fetcher
            .fetch(url, &staged, staging.path(), cancel)
            .await?;
        if !output.success() {
            tracing::error!(theme = %name, status = ?output.status, "{}", output.stderr.trim_end());
            return Err(StoreError::Fetch {
                theme: name.clone(),
                url: url.to_owned(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        if !matches!(inspect_theme_dir(&staged), Lookup::Found(())) {
            return Err(StoreError::Fetch {
                theme: name.clone(),
                url: url.to_owned(),
                status: output.status,
                stderr: format!("fetch produced no files at {}", staged.display()),
            });
        }

        // An empty leftover directory counts as absent; clear it for the rename.
        if dest.is_dir() {
            fs::remove_dir(&dest).map_err(|e| io_err(&dest, e))?;
        }
        fs::rename(&staged, &dest).map_err(|e| io_err(&dest, e))?;
        tracing::info!(theme = %name, path = %dest.display(), "done fetching theme");

        Ok(Theme {
            name: name.clone(),
            path: dest,
        })
    }
}

/// A theme directory is usable when it exists, is a directory and is non-empty.
fn inspect_theme_dir(path: &Path) -> Lookup<()> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Lookup::NotFound,
        Err(err) => return Lookup::Unreadable(format!("{}: {err}", path.display())),
    };
    if !meta.is_dir() {
        return Lookup::Corrupt(format!("{} is not a directory", path.display()));
    }
    match fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                Lookup::Found(())
            } else {
                Lookup::NotFound
            }
        }
        Err(err) => Lookup::Unreadable(format!("{}: {err}", path.display())),
    }
}
