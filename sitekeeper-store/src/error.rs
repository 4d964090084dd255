//! Error types for sitekeeper-store.

use std::path::PathBuf;

use thiserror::Error;

use sitekeeper_core::{ConfigError, SiteId, ThemeName};
use sitekeeper_runner::RunnerError;

/// All errors that can arise from store and site operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The theme is absent locally and there is nowhere to fetch it from.
    #[error("theme '{theme}' is not available locally and no source URL was given")]
    MissingThemeSource { theme: ThemeName },

    /// The fetch tool ran and failed.
    #[error("failed to fetch theme '{theme}' from {url} ({}): {stderr}", exit_label(.status))]
    Fetch {
        theme: ThemeName,
        url: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The build engine ran and failed; `stderr` is its diagnostic output.
    #[error("build engine {operation} failed for site '{site}' ({}): {stderr}", exit_label(.status))]
    Engine {
        operation: &'static str,
        site: SiteId,
        status: Option<i32>,
        stderr: String,
    },

    #[error("theme '{theme}' already exists at {path}")]
    ThemeExists { theme: ThemeName, path: PathBuf },

    /// A theme directory exists but cannot be used.
    #[error("theme '{theme}' is unavailable: {detail}")]
    ThemeUnavailable { theme: ThemeName, detail: String },

    #[error("site '{id}' already exists at {path}")]
    SiteExists { id: SiteId, path: PathBuf },

    #[error("site '{id}' not found")]
    SiteNotFound { id: SiteId },

    /// A site directory exists but its config is missing, corrupt or unreadable.
    #[error("site '{id}' is unavailable: {detail}")]
    SiteUnavailable { id: SiteId, detail: String },

    #[error("nothing to bundle: publish directory {path} does not exist")]
    PublishDirMissing { path: PathBuf },

    /// Config encode/decode/write failure.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An external process could not be run to completion.
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_owned(),
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
