//! Error types for sitekeeper-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from identifier validation, config and settings I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML encode failure while persisting a site config.
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// TOML parse error on load, with the file path.
    #[error("failed to parse site config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Malformed `settings.yaml`.
    #[error("failed to parse settings at {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A site ID or theme name that cannot be used as a single path component.
    #[error("invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    /// `dirs::home_dir()` returned `None`, so there is no `~/.sitekeeper/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`ConfigError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
