// Copyright 2025 Codevault (https://github.com/codevault)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Blob gateway: a hierarchical byte store rooted at a configured
//! directory.
//!
//! All paths are relative to the root; callers never see the root. The
//! gateway holds no business logic, it only writes named blobs under
//! directories, reads them back, and answers "lexicographically greatest
//! entry" queries, which is all the snapshot naming scheme needs to find
//! the latest version.

use codevault_core::{Result, StorageConfig, VaultError};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write as IoWrite};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Filesystem-backed blob store.
pub struct BlobGateway {
    root: PathBuf,
    fsync: bool,
}

impl BlobGateway {
    /// Open a gateway, creating the root directory if needed.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { root: config.root.clone(), fsync: config.fsync })
    }

    /// Resolve a caller-relative path under the root.
    ///
    /// Absolute paths and `..` components are rejected so a caller can
    /// never name anything outside the configured root.
    fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel_path = Path::new(rel);
        let escapes = rel_path.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(VaultError::invalid_ref(format!("path escapes storage root: {rel}")));
        }
        Ok(self.root.join(rel_path))
    }

    /// Create a directory (and any missing parents) under the root.
    pub fn create_dir(&self, path: &str) -> Result<()> {
        let abs = self.resolve(path)?;
        fs::create_dir_all(&abs)?;
        Ok(())
    }

    /// Whether a directory exists under the root.
    pub fn dir_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Write a named blob, create-or-truncate.
    pub fn write_blob(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let abs = self.resolve(path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&abs)?;
        file.write_all(bytes)?;
        file.flush()?;
        if self.fsync {
            file.sync_all()?;
        }
        debug!(path, len = bytes.len(), "blob written");
        Ok(())
    }

    /// Read a blob. Fails with `NotFound` when absent.
    pub fn read_blob(&self, path: &str) -> Result<Vec<u8>> {
        let abs = self.resolve(path)?;
        let mut file = match File::open(&abs) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::not_found(format!("blob {path}")));
            }
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Name of the lexicographically greatest regular file in a directory.
    ///
    /// Fails with `NotFound` when the directory is missing or holds no
    /// regular files.
    pub fn list_latest(&self, dir: &str) -> Result<String> {
        let abs = self.resolve(dir)?;
        let entries = match fs::read_dir(&abs) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::not_found(format!("directory {dir}")));
            }
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<String> = None;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if latest.as_deref().map(|l| name.as_str() > l).unwrap_or(true) {
                latest = Some(name);
            }
        }

        latest.ok_or_else(|| VaultError::not_found(format!("no entries in {dir}")))
    }

    /// Recursively delete a directory. Deleting a missing directory is not
    /// an error.
    pub fn delete_dir(&self, path: &str) -> Result<()> {
        let abs = self.resolve(path)?;
        match fs::remove_dir_all(&abs) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Root-relative path of the gateway's index file storage, used by the
    /// stores that persist themselves next to the blobs.
    pub(crate) fn index_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway() -> (TempDir, BlobGateway) {
        let dir = TempDir::new().unwrap();
        let gw = BlobGateway::open(&StorageConfig::ephemeral(dir.path())).unwrap();
        (dir, gw)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, gw) = gateway();
        gw.create_dir("7/abc-main-py").unwrap();
        gw.write_blob("7/abc-main-py/abc_20250830_142501.py", b"print('hi')\n")
            .unwrap();

        let bytes = gw.read_blob("7/abc-main-py/abc_20250830_142501.py").unwrap();
        assert_eq!(bytes, b"print('hi')\n");
    }

    #[test]
    fn test_write_truncates() {
        let (_dir, gw) = gateway();
        gw.write_blob("a.txt", b"long original content").unwrap();
        gw.write_blob("a.txt", b"short").unwrap();
        assert_eq!(gw.read_blob("a.txt").unwrap(), b"short");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, gw) = gateway();
        let err = gw.read_blob("nope/missing.py").unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn test_list_latest_lexicographic() {
        let (_dir, gw) = gateway();
        gw.create_dir("d").unwrap();
        gw.write_blob("d/f_20250830_142501.py", b"1").unwrap();
        gw.write_blob("d/f_20250830_142503.py", b"3").unwrap();
        gw.write_blob("d/f_20250830_142502.py", b"2").unwrap();

        assert_eq!(gw.list_latest("d").unwrap(), "f_20250830_142503.py");
    }

    #[test]
    fn test_list_latest_empty_and_missing() {
        let (_dir, gw) = gateway();
        assert!(matches!(gw.list_latest("ghost"), Err(VaultError::NotFound(_))));
        gw.create_dir("empty").unwrap();
        assert!(matches!(gw.list_latest("empty"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_list_latest_skips_subdirectories() {
        let (_dir, gw) = gateway();
        gw.create_dir("d/zzz-subdir").unwrap();
        gw.write_blob("d/aaa.py", b"x").unwrap();
        assert_eq!(gw.list_latest("d").unwrap(), "aaa.py");
    }

    #[test]
    fn test_delete_dir() {
        let (_dir, gw) = gateway();
        gw.create_dir("p/q").unwrap();
        gw.write_blob("p/q/a", b"x").unwrap();
        gw.delete_dir("p").unwrap();
        assert!(!gw.dir_exists("p"));
        // Deleting again is fine
        gw.delete_dir("p").unwrap();
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, gw) = gateway();
        assert!(matches!(
            gw.read_blob("../outside"),
            Err(VaultError::InvalidReference(_))
        ));
        assert!(matches!(
            gw.write_blob("/etc/hosts", b"x"),
            Err(VaultError::InvalidReference(_))
        ));
    }
}
