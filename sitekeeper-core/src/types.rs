//! Domain types for sitekeeper.
//!
//! Identifiers are validated on construction: a [`SiteId`] or [`ThemeName`]
//! is always safe to use as a single path component under a store root.
//! All path fields use `PathBuf`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest identifier accepted for a site or theme.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

fn validate_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidIdentifier {
        kind,
        value: value.to_owned(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("must be at most 128 bytes"));
    }
    if value == "." || value == ".." {
        return Err(invalid("must not be a relative path component"));
    }
    if !value.as_bytes()[0].is_ascii_alphanumeric() {
        return Err(invalid("must start with an ASCII letter or digit"));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
    {
        return Err(invalid("may only contain ASCII letters, digits, '.', '_' and '-'"));
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap `value`.
            pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
                let value = value.into();
                validate_identifier($kind, &value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<Path> for $name {
            fn as_ref(&self) -> &Path {
                Path::new(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ConfigError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

identifier!(
    /// Caller-supplied unique key of a site; names its directory under the site root.
    SiteId,
    "site id"
);

identifier!(
    /// Name of a theme; names its directory under the theme root.
    ThemeName,
    "theme name"
);

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

/// A theme whose assets are present under the theme root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// Directories handed to the build engine. Always derived by the site store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub themes_dir: PathBuf,
    pub content_dir: PathBuf,
    pub layout_dir: PathBuf,
    pub publish_dir: PathBuf,
}

impl SiteLayout {
    pub const CONTENT_DIR: &'static str = "content";
    pub const LAYOUT_DIR: &'static str = "layout";
    pub const PUBLISH_DIR: &'static str = "public";

    /// Layout of a site rooted at `site_root` whose themes live in `themes_dir`.
    pub fn derive(site_root: &Path, themes_dir: &Path) -> Self {
        Self {
            themes_dir: themes_dir.to_path_buf(),
            content_dir: site_root.join(Self::CONTENT_DIR),
            layout_dir: site_root.join(Self::LAYOUT_DIR),
            publish_dir: site_root.join(Self::PUBLISH_DIR),
        }
    }

    /// The directories that live inside the site root.
    pub fn site_dirs(&self) -> [&Path; 3] {
        [&self.content_dir, &self.layout_dir, &self.publish_dir]
    }
}

/// Metadata passed through to the build engine's config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteMetadata {
    pub base_url: String,
    pub language_code: String,
    pub title: String,
}

/// A request to create a site. Carries no derived fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub id: SiteId,
    pub theme: ThemeName,
    /// Remote source used only if the theme is absent locally.
    pub theme_url: Option<String>,
    pub metadata: SiteMetadata,
}

/// Full runtime description of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub id: SiteId,
    pub theme: ThemeName,
    pub theme_url: Option<String>,
    /// The site's working directory, `<site root>/<id>`.
    pub root: PathBuf,
    pub layout: SiteLayout,
    pub metadata: SiteMetadata,
}

impl SiteConfig {
    /// Bind a creation request to its place in the store.
    pub fn from_request(request: NewSite, site_root: PathBuf, themes_dir: &Path) -> Self {
        let layout = SiteLayout::derive(&site_root, themes_dir);
        Self {
            id: request.id,
            theme: request.theme,
            theme_url: request.theme_url,
            root: site_root,
            layout,
            metadata: request.metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
