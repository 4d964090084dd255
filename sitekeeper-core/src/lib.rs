//! sitekeeper core library: domain types, site config persistence, settings, errors.
//!
//! - [`types`]: validated identifiers and the site/theme domain structs
//! - [`lookup`]: [`Lookup`], the tagged result of store lookups
//! - [`config`]: TOML codec for the per-site `config.toml`
//! - [`settings`]: tool settings loaded from `~/.sitekeeper/settings.yaml`
//! - [`paths`]: store layout helpers and owner-only permissions
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod lookup;
pub mod paths;
pub mod settings;
pub mod types;

pub use config::ConfigFile;
pub use error::ConfigError;
pub use lookup::Lookup;
pub use settings::Settings;
pub use types::{NewSite, SiteConfig, SiteId, SiteLayout, SiteMetadata, Theme, ThemeName};
