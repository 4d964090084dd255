//! Per-site `config.toml` codec.
//!
//! The file is read by the build engine, so keys follow its naming
//! (`themesDir`, `baseURL`, ...). Identity, theme URL and the site root are
//! process-local and never written. Derived directories are written for the
//! engine's benefit but never trusted on load: [`ConfigFile::into_site`]
//! recomputes them from where the file was found.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::paths::set_file_permissions;
use crate::types::{SiteConfig, SiteId, SiteLayout, SiteMetadata, ThemeName};

/// On-disk form of a [`SiteConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "themesDir", default)]
    pub themes_dir: PathBuf,
    #[serde(rename = "contentDir", default)]
    pub content_dir: PathBuf,
    #[serde(rename = "layoutDir", default)]
    pub layout_dir: PathBuf,
    #[serde(rename = "publishDir", default)]
    pub publish_dir: PathBuf,

    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
    #[serde(default)]
    pub title: String,
    pub theme: ThemeName,
}

impl ConfigFile {
    pub fn from_site(config: &SiteConfig) -> Self {
        Self {
            themes_dir: config.layout.themes_dir.clone(),
            content_dir: config.layout.content_dir.clone(),
            layout_dir: config.layout.layout_dir.clone(),
            publish_dir: config.layout.publish_dir.clone(),
            base_url: config.metadata.base_url.clone(),
            language_code: config.metadata.language_code.clone(),
            title: config.metadata.title.clone(),
            theme: config.theme.clone(),
        }
    }

    /// Rebuild the runtime config for a site discovered at `site_root`.
    ///
    /// Stored directory fields are ignored; the layout is derived again.
    pub fn into_site(self, id: SiteId, site_root: PathBuf, themes_dir: &Path) -> SiteConfig {
        let layout = SiteLayout::derive(&site_root, themes_dir);
        SiteConfig {
            id,
            theme: self.theme,
            theme_url: None,
            root: site_root,
            layout,
            metadata: SiteMetadata {
                base_url: self.base_url,
                language_code: self.language_code,
                title: self.title,
            },
        }
    }
}

/// Serialize to TOML text.
pub fn encode(file: &ConfigFile) -> Result<String, ConfigError> {
    Ok(toml::to_string(file)?)
}

/// Parse TOML text read from `path`.
pub fn decode(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and parse the config at `path`.
pub fn load_at(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    decode(path, &contents)
}

/// Atomically write `file` to `path`.
///
/// Write flow: serialize → `<path>.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
    let toml = encode(file)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, toml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SiteConfig {
        SiteConfig {
            id: SiteId::new("acme").unwrap(),
            theme: ThemeName::new("ananke").unwrap(),
            theme_url: Some("https://example.com/ananke.git".into()),
            root: PathBuf::from("/srv/sites/acme"),
            layout: SiteLayout::derive(Path::new("/srv/sites/acme"), Path::new("/srv/themes")),
            metadata: SiteMetadata {
                base_url: "http://localhost".into(),
                language_code: "en-us".into(),
                title: "Test Site".into(),
            },
        }
    }

    #[test]
    fn encode_uses_engine_key_names() {
        let toml = encode(&ConfigFile::from_site(&sample())).unwrap();
        for key in [
            "themesDir",
            "contentDir",
            "layoutDir",
            "publishDir",
            "baseURL",
            "languageCode",
            "title",
            "theme",
        ] {
            assert!(toml.contains(&format!("{key} = ")), "missing {key} in:\n{toml}");
        }
    }

    #[test]
    fn process_local_fields_are_not_persisted() {
        let toml = encode(&ConfigFile::from_site(&sample())).unwrap();
        assert!(!toml.contains("example.com"), "theme URL leaked:\n{toml}");
        assert!(!toml.contains("id ="), "id leaked:\n{toml}");
    }

    #[test]
    fn decode_garbage_is_parse_error_with_path() {
        let err = decode(Path::new("/x/config.toml"), "theme = [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("/x/config.toml"));
    }

    #[test]
    fn decode_rejects_unsafe_theme_name() {
        let err = decode(Path::new("c.toml"), "theme = \"../../etc\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn save_cleans_up_tmp_and_sets_mode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_at(&path, &ConfigFile::from_site(&sample())).expect("save");
        assert!(!path.with_extension("toml.tmp").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
