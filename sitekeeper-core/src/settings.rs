//! Tool settings, read from `~/.sitekeeper/settings.yaml`.
//!
//! Every key is optional; a missing file means all defaults.
//!
//! ```yaml
//! sites_root: /srv/sites
//! themes_root: /srv/themes
//! engine_program: hugo
//! fetcher_program: git
//! max_concurrent_jobs: 4
//! command_timeout_secs: 600
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::paths::{settings_path, DEFAULT_SITES_ROOT, DEFAULT_THEMES_ROOT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub sites_root: PathBuf,
    pub themes_root: PathBuf,
    /// Build engine executable, resolved through `$PATH` unless absolute.
    pub engine_program: String,
    /// Remote fetch executable.
    pub fetcher_program: String,
    /// Upper bound on concurrently running external processes.
    pub max_concurrent_jobs: usize,
    /// Per-invocation timeout; `0` disables it.
    pub command_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sites_root: PathBuf::from(DEFAULT_SITES_ROOT),
            themes_root: PathBuf::from(DEFAULT_THEMES_ROOT),
            engine_program: "hugo".to_owned(),
            fetcher_program: "git".to_owned(),
            max_concurrent_jobs: 4,
            command_timeout_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings for `home`, falling back to defaults if the file is absent.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = settings_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut settings: Self = serde_yaml::from_str(&contents)
            .map_err(|source| ConfigError::Settings { path, source })?;
        settings.max_concurrent_jobs = settings.max_concurrent_jobs.max(1);
        Ok(settings)
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&home()?)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
