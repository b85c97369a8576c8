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

//! File version manager: the save/latest protocol.
//!
//! # Save protocol
//!
//! 1. Resolve the file's snapshot directory and ensure it exists.
//! 2. Read the current latest snapshot. Byte-identical content returns
//!    the existing snapshot's metadata; nothing is written.
//! 3. Otherwise compute the snapshot name from the current timestamp
//!    (appending a `_N` counter when the latest snapshot already occupies
//!    this second), write the blob, then append the metadata record.
//!
//! The blob is always written **before** the metadata record: a failed
//! blob write surfaces `StorageUnavailable` and leaves no dangling index
//! entry pointing at missing content.
//!
//! Saves for one file are serialized through a keyed lock table, so two
//! concurrent saves cannot race between "read latest" and "write new
//! snapshot". Writers to distinct files never contend.

use crate::catalog::Catalog;
use crate::gateway::BlobGateway;
use crate::snapshot_store::SnapshotStore;
use codevault_core::{
    counter_key, extension, snapshot_dir, snapshot_name, timestamp_key_of, FileId, FileIdentity,
    FolderId, Result, SnapshotMetadata, VaultError,
};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns snapshot naming, deduplication, and the latest/list queries.
pub struct FileVersionManager {
    gateway: Arc<BlobGateway>,
    catalog: Arc<Catalog>,
    snapshots: Arc<SnapshotStore>,
    /// Per-file save locks.
    locks: DashMap<FileId, Arc<Mutex<()>>>,
}

impl FileVersionManager {
    pub fn new(
        gateway: Arc<BlobGateway>,
        catalog: Arc<Catalog>,
        snapshots: Arc<SnapshotStore>,
    ) -> Self {
        Self { gateway, catalog, snapshots, locks: DashMap::new() }
    }

    fn lock_for(&self, file_id: &FileId) -> Arc<Mutex<()>> {
        self.locks
            .entry(file_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Snapshot directory for a file, relative to the gateway root.
    fn dir_of(&self, identity: &FileIdentity) -> Result<String> {
        let project_id = self.catalog.project_of_folder(identity.folder_id)?;
        Ok(snapshot_dir(project_id, &identity.id, &identity.filename))
    }

    /// Return the existing identity for `(filename, folder_id)` or create
    /// one. No storage side effect; the directory is created on first save.
    pub fn ensure_file(
        &self,
        filename: &str,
        folder_id: FolderId,
        owner: &str,
    ) -> Result<FileIdentity> {
        self.catalog.ensure_file(filename, folder_id, owner)
    }

    /// Save new content for a file.
    ///
    /// Guarantee: after this returns, `latest` yields `content`.
    pub fn save(
        &self,
        file_id: &FileId,
        content: &[u8],
        author: &str,
        summary: &str,
    ) -> Result<SnapshotMetadata> {
        let identity = self.catalog.file(file_id)?;
        let dir = self.dir_of(&identity)?;
        let ext = extension(&identity.filename).to_string();

        let lock = self.lock_for(file_id);
        let _guard = lock.lock();

        self.gateway.create_dir(&dir)?;

        // Dedup against the latest snapshot, if any.
        let latest_key = match self.gateway.list_latest(&dir) {
            Ok(name) => {
                let existing = self.gateway.read_blob(&format!("{dir}/{name}"))?;
                if existing == content {
                    debug!(%file_id, snapshot = %name, "identical content, save deduplicated");
                    let key = timestamp_key_of(&name, file_id, &ext);
                    let record = self
                        .snapshots
                        .list(file_id)
                        .into_iter()
                        .find(|m| Some(&m.timestamp_key) == key.as_ref())
                        .or_else(|| self.snapshots.latest_record(file_id));
                    if let Some(record) = record {
                        return Ok(record);
                    }
                    // Index lost its record for an existing blob; fall
                    // through and re-snapshot rather than invent metadata.
                    None
                } else {
                    timestamp_key_of(&name, file_id, &ext)
                }
            }
            Err(VaultError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        let base_key = SnapshotMetadata::format_timestamp(now);
        let key = next_key(&base_key, latest_key.as_deref());
        let name = snapshot_name(file_id, &key, &ext);

        // Blob before metadata.
        self.gateway.write_blob(&format!("{dir}/{name}"), content)?;

        let meta = SnapshotMetadata {
            file_id: file_id.clone(),
            author: author.to_string(),
            timestamp: now,
            summary: summary.to_string(),
            timestamp_key: key,
        };
        self.snapshots.append(meta.clone());
        info!(%file_id, snapshot = %name, author, "snapshot saved");
        Ok(meta)
    }

    /// Name and content of the latest snapshot.
    pub fn latest(&self, file_id: &FileId) -> Result<(String, Vec<u8>)> {
        let identity = self.catalog.file(file_id)?;
        let dir = self.dir_of(&identity)?;
        let name = self
            .gateway
            .list_latest(&dir)
            .map_err(|_| VaultError::not_found(format!("no snapshot for file {file_id}")))?;
        let content = self.gateway.read_blob(&format!("{dir}/{name}"))?;
        Ok((name, content))
    }

    /// Content of one named snapshot, addressed by its timestamp key.
    pub fn read_snapshot(&self, file_id: &FileId, timestamp_key: &str) -> Result<Vec<u8>> {
        let identity = self.catalog.file(file_id)?;
        let dir = self.dir_of(&identity)?;
        let name = snapshot_name(file_id, timestamp_key, extension(&identity.filename));
        self.gateway.read_blob(&format!("{dir}/{name}"))
    }

    /// All snapshot metadata for a file, most-recent-first.
    pub fn list_snapshots(&self, file_id: &FileId) -> Result<Vec<SnapshotMetadata>> {
        self.catalog.file(file_id)?;
        Ok(self.snapshots.list(file_id))
    }
}

/// Length of a bare `yyyyMMdd_HHmmss` timestamp key.
const BARE_KEY_LEN: usize = 15;

/// Split a timestamp key into its bare timestamp and collision counter.
fn split_key(key: &str) -> (&str, Option<u32>) {
    if key.len() > BARE_KEY_LEN {
        if let Some(n) = key[BARE_KEY_LEN..]
            .strip_prefix('_')
            .and_then(|rest| rest.parse::<u32>().ok())
        {
            return (&key[..BARE_KEY_LEN], Some(n));
        }
    }
    (key, None)
}

/// Next timestamp key given the freshly formatted timestamp and the key of
/// the current latest snapshot.
///
/// A second save within one timestamp second gets `_2`, then `_3`, and so
/// on. `_` sorts after `.`, so suffixed names keep the directory's
/// latest-is-lexicographic-max invariant. When the clock has regressed
/// below the latest snapshot's second, the counter continues on the
/// latest second instead, so new names never sort below the current
/// latest.
fn next_key(base_key: &str, latest_key: Option<&str>) -> String {
    let Some(latest) = latest_key else {
        return base_key.to_string();
    };
    let (latest_base, latest_count) = split_key(latest);
    if latest_base < base_key {
        return base_key.to_string();
    }
    counter_key(latest_base, latest_count.unwrap_or(1) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codevault_core::StorageConfig;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        manager: FileVersionManager,
        catalog: Arc<Catalog>,
        snapshots: Arc<SnapshotStore>,
        folder: FolderId,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(BlobGateway::open(&StorageConfig::ephemeral(dir.path())).unwrap());
        let catalog = Arc::new(Catalog::new());
        let snapshots = Arc::new(SnapshotStore::new());
        let project = catalog.create_project("demo", "alice");
        let folder = catalog.create_folder("src", project.id, None).unwrap();
        let manager = FileVersionManager::new(gateway, catalog.clone(), snapshots.clone());
        Fixture { _dir: dir, manager, catalog, snapshots, folder: folder.id }
    }

    #[test]
    fn test_save_then_latest() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();
        fx.manager.save(&file.id, b"print(1)\n", "alice", "initial").unwrap();

        let (name, content) = fx.manager.latest(&file.id).unwrap();
        assert!(name.starts_with(&format!("{}_", file.id)));
        assert!(name.ends_with(".py"));
        assert_eq!(content, b"print(1)\n");
    }

    #[test]
    fn test_idempotent_save() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();

        let first = fx.manager.save(&file.id, b"same\n", "alice", "initial").unwrap();
        let second = fx.manager.save(&file.id, b"same\n", "bob", "again").unwrap();

        assert_eq!(first.timestamp_key, second.timestamp_key);
        assert_eq!(second.author, "alice");
        assert_eq!(fx.snapshots.count(&file.id), 1);
        assert_eq!(fx.manager.list_snapshots(&file.id).unwrap().len(), 1);
    }

    #[test]
    fn test_latest_correctness_over_many_saves() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();

        let mut names = Vec::new();
        for i in 0..5 {
            let content = format!("version {i}\n");
            fx.manager.save(&file.id, content.as_bytes(), "alice", "edit").unwrap();
            names.push(fx.manager.latest(&file.id).unwrap().0);
        }

        let (latest_name, latest_content) = fx.manager.latest(&file.id).unwrap();
        assert_eq!(latest_content, b"version 4\n");
        assert_eq!(&latest_name, names.iter().max().unwrap());
        assert_eq!(fx.snapshots.count(&file.id), 5);
    }

    #[test]
    fn test_same_second_saves_get_counters() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();

        // Saves land within the same wall-clock second in practice.
        let a = fx.manager.save(&file.id, b"a\n", "alice", "one").unwrap();
        let b = fx.manager.save(&file.id, b"b\n", "alice", "two").unwrap();
        let c = fx.manager.save(&file.id, b"c\n", "alice", "three").unwrap();

        let keys = [&a.timestamp_key, &b.timestamp_key, &c.timestamp_key];
        assert_eq!(keys.iter().collect::<std::collections::HashSet<_>>().len(), 3);
        assert!(keys[0] < keys[1] && keys[1] < keys[2]);
        assert_eq!(fx.manager.latest(&file.id).unwrap().1, b"c\n");
    }

    #[test]
    fn test_latest_without_snapshot_is_not_found() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();
        assert!(matches!(fx.manager.latest(&file.id), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_save_unknown_file_is_not_found() {
        let fx = fixture();
        let err = fx
            .manager
            .save(&FileId::from_string("ghost"), b"x", "alice", "s")
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn test_read_snapshot_by_key() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();
        let meta = fx.manager.save(&file.id, b"v1\n", "alice", "one").unwrap();
        fx.manager.save(&file.id, b"v2\n", "alice", "two").unwrap();

        let content = fx.manager.read_snapshot(&file.id, &meta.timestamp_key).unwrap();
        assert_eq!(content, b"v1\n");
    }

    #[test]
    fn test_no_extension_filename() {
        let fx = fixture();
        let file = fx.manager.ensure_file("Makefile", fx.folder, "alice").unwrap();
        fx.manager.save(&file.id, b"all:\n", "alice", "initial").unwrap();
        let (name, content) = fx.manager.latest(&file.id).unwrap();
        assert!(!name.contains('.'));
        assert_eq!(content, b"all:\n");
    }

    #[test]
    fn test_concurrent_saves_are_serialized() {
        let fx = fixture();
        let file = fx.manager.ensure_file("main.py", fx.folder, "alice").unwrap();
        let manager = Arc::new(fx.manager);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let manager = manager.clone();
                let id = file.id.clone();
                std::thread::spawn(move || {
                    let content = format!("writer {i}\n");
                    manager.save(&id, content.as_bytes(), "alice", "race").unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Every distinct write got its own snapshot; none were lost.
        assert_eq!(fx.snapshots.count(&file.id), 4);
        let (_, latest) = manager.latest(&file.id).unwrap();
        assert!(latest.starts_with(b"writer "));
    }

    #[test]
    fn test_next_key_counters() {
        assert_eq!(next_key("20250830_142501", None), "20250830_142501");
        assert_eq!(next_key("20250830_142501", Some("20250830_142500")), "20250830_142501");
        assert_eq!(next_key("20250830_142501", Some("20250830_142501")), "20250830_142501_2");
        assert_eq!(
            next_key("20250830_142501", Some("20250830_142501_2")),
            "20250830_142501_3"
        );
        // Clock regression continues on the latest second
        assert_eq!(
            next_key("20250830_142500", Some("20250830_142501")),
            "20250830_142501_2"
        );
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("20250830_142501"), ("20250830_142501", None));
        assert_eq!(split_key("20250830_142501_7"), ("20250830_142501", Some(7)));
    }
}
