//! Deterministic `tar.zst` archives of a site's publish directory.
//!
//! Two archives of the same tree are byte-identical: entries are walked in
//! file-name order, timestamps and ownership are zeroed and modes normalised.
//! Symlinks are skipped rather than followed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tar::{EntryType, Header};
use walkdir::WalkDir;

use sitekeeper_core::paths;

use crate::error::{io_err, StoreError};

const ZSTD_LEVEL: i32 = 3;

/// A compressed archive held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub bytes: Vec<u8>,
    /// Regular files in the archive (directories not counted).
    pub file_count: usize,
    /// Sum of regular file sizes before compression.
    pub uncompressed_size: u64,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
}

impl Bundle {
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Atomically write the archive to `path` (tmp file + rename).
    pub fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = tmp_path(path);
        fs::write(&tmp, &self.bytes).map_err(|e| io_err(&tmp, e))?;
        paths::set_file_permissions(&tmp)?;
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(path, err));
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Archive everything under `root`, with paths relative to it.
pub fn archive_dir(root: &Path) -> Result<Bundle, StoreError> {
    if !root.is_dir() {
        return Err(StoreError::PublishDirMissing {
            path: root.to_path_buf(),
        });
    }

    let mut builder = tar::Builder::new(Vec::new());
    let mut file_count = 0usize;
    let mut uncompressed_size = 0u64;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry.map_err(|e| walk_err(root, e))?;
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path);
        let file_type = entry.file_type();

        let mut header = Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        if file_type.is_dir() {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder
                .append_data(&mut header, rel, std::io::empty())
                .map_err(|e| io_err(path, e))?;
        } else if file_type.is_file() {
            let len = entry.metadata().map_err(|e| walk_err(path, e))?.len();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(len);
            let file = File::open(path).map_err(|e| io_err(path, e))?;
            builder
                .append_data(&mut header, rel, file)
                .map_err(|e| io_err(path, e))?;
            file_count += 1;
            uncompressed_size += len;
        } else {
            tracing::debug!(path = %path.display(), "skipping non-regular entry in bundle");
        }
    }

    let tar_bytes = builder.into_inner().map_err(|e| io_err(root, e))?;
    let bytes = zstd::encode_all(tar_bytes.as_slice(), ZSTD_LEVEL).map_err(|e| io_err(root, e))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));

    tracing::debug!(
        root = %root.display(),
        files = file_count,
        compressed = bytes.len(),
        "bundle created"
    );
    Ok(Bundle {
        bytes,
        file_count,
        uncompressed_size,
        sha256,
    })
}

fn walk_err(path: &Path, err: walkdir::Error) -> StoreError {
    let path = err.path().unwrap_or(path).to_path_buf();
    io_err(path, err.into())
}
