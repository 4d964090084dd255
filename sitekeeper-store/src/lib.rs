//! # sitekeeper-store
//!
//! On-disk registries of themes and sites.
//!
//! [`SiteStore::create`] resolves the theme through [`ThemeStore`], persists
//! the site config, scaffolds the site with the build engine and promotes it
//! into place with a single rename. [`SiteStore::find`] reconstructs a
//! [`Site`] from disk; [`Site`] builds, renders and bundles.

pub mod bundle;
pub mod error;
pub mod locks;
pub mod site;
pub mod site_store;
pub mod theme_store;

use std::sync::Arc;

use sitekeeper_core::Settings;
use sitekeeper_runner::{CommandRunner, GitFetcher, HugoEngine, ProcessRunner};

pub use bundle::Bundle;
pub use error::StoreError;
pub use site::{BuildReport, RenderReport, Site};
pub use site_store::SiteStore;
pub use theme_store::ThemeStore;

/// Open both stores as configured by `settings`, sharing one process runner.
pub fn open_stores(settings: &Settings) -> SiteStore {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::from_settings(settings));
    open_stores_with(settings, runner)
}

/// [`open_stores`] with an explicit runner (tests substitute a fake one).
pub fn open_stores_with(settings: &Settings, runner: Arc<dyn CommandRunner>) -> SiteStore {
    let fetcher = GitFetcher::new(&settings.fetcher_program, runner.clone());
    let themes = Arc::new(ThemeStore::open(&settings.themes_root, fetcher));
    let engine = HugoEngine::new(&settings.engine_program, runner);
    SiteStore::open(&settings.sites_root, themes, engine)
}
