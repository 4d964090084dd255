//! Store layout and permission helpers.
//!
//! ```text
//! <sites root>/                (mode 0700)
//!   <id>/
//!     config.toml              (mode 0600)
//!     content/  layout/  public/
//!   .staging-XXXX/             (transient, during create)
//!
//! <themes root>/               (mode 0700)
//!   <theme>/
//!   .fetch-XXXX/               (transient, during fetch)
//!
//! ~/.sitekeeper/settings.yaml
//! ```

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::{SiteId, ThemeName};

pub const DEFAULT_SITES_ROOT: &str = "/tmp/sites";
pub const DEFAULT_THEMES_ROOT: &str = "/tmp/themes";

/// Well-known config filename inside every site root.
pub const SITE_CONFIG_FILE: &str = "config.toml";

pub const SETTINGS_FILE: &str = "settings.yaml";

/// Prefix of per-create staging directories under the sites root.
pub const SITE_STAGING_PREFIX: &str = ".staging-";

/// Prefix of per-fetch staging directories under the themes root.
pub const THEME_STAGING_PREFIX: &str = ".fetch-";

/// `<home>/.sitekeeper/`
pub fn sitekeeper_root(home: &Path) -> PathBuf {
    home.join(".sitekeeper")
}

/// `<home>/.sitekeeper/settings.yaml`
pub fn settings_path(home: &Path) -> PathBuf {
    sitekeeper_root(home).join(SETTINGS_FILE)
}

/// `<sites root>/<id>/`
pub fn site_dir(sites_root: &Path, id: &SiteId) -> PathBuf {
    sites_root.join(id.as_str())
}

/// `<sites root>/<id>/config.toml`
pub fn site_config_path(site_dir: &Path) -> PathBuf {
    site_dir.join(SITE_CONFIG_FILE)
}

/// `<staging>/<id>.toml`, where the config lives before relocation.
pub fn staged_config_path(staging: &Path, id: &SiteId) -> PathBuf {
    staging.join(format!("{id}.toml"))
}

/// `<themes root>/<theme>/`
pub fn theme_dir(themes_root: &Path, name: &ThemeName) -> PathBuf {
    themes_root.join(name.as_str())
}

/// Entries whose names start with `.` are store bookkeeping, never sites or themes.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Create `root` (mode `0700`) if it does not yet exist.
pub fn ensure_store_root(root: &Path) -> Result<(), ConfigError> {
    if !root.exists() {
        std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
        set_dir_permissions(root)?;
    }
    Ok(())
}

#[cfg(unix)]
pub fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
pub fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
