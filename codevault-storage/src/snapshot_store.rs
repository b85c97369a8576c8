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

//! Snapshot store: per-file append-only log of snapshot metadata.
//!
//! The blob named by each record is the source of truth for content; this
//! store is a secondary index for listing and authorship. Records are
//! appended by the version manager only after the blob write succeeded,
//! so the index never points at missing content.

use codevault_core::{FileId, Result, SnapshotMetadata, VaultError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// In-memory metadata index with bincode persistence.
pub struct SnapshotStore {
    records: DashMap<FileId, Vec<SnapshotMetadata>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    records: Vec<(FileId, Vec<SnapshotMetadata>)>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self { records: DashMap::new() }
    }

    /// Append a metadata record to a file's log.
    pub fn append(&self, meta: SnapshotMetadata) {
        self.records.entry(meta.file_id.clone()).or_default().push(meta);
    }

    /// All records for a file, most-recent-first.
    pub fn list(&self, file_id: &FileId) -> Vec<SnapshotMetadata> {
        let mut records = self
            .records
            .get(file_id)
            .map(|r| r.clone())
            .unwrap_or_default();
        // timestamp_key carries the collision counter, so it breaks ties
        // between same-second records in write order.
        records.sort_by(|a, b| {
            (b.timestamp, &b.timestamp_key).cmp(&(a.timestamp, &a.timestamp_key))
        });
        records
    }

    /// The most recent record for a file, if any.
    pub fn latest_record(&self, file_id: &FileId) -> Option<SnapshotMetadata> {
        self.list(file_id).into_iter().next()
    }

    /// Number of snapshots recorded for a file.
    pub fn count(&self, file_id: &FileId) -> usize {
        self.records.get(file_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Drop every record of a file (project deletion cascade).
    pub fn remove(&self, file_id: &FileId) {
        self.records.remove(file_id);
    }

    // === Persistence ===

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let snapshot = StoreSnapshot {
            records: self
                .records
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect(),
        };
        let data = bincode::serialize(&snapshot)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let snapshot: StoreSnapshot = bincode::deserialize(&data)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        let store = Self::new();
        for (file_id, records) in snapshot.records {
            store.records.insert(file_id, records);
        }
        Ok(store)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meta(file: &str, secs: u32, key: &str) -> SnapshotMetadata {
        SnapshotMetadata {
            file_id: FileId::from_string(file),
            author: "tester".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 8, 30, 14, 25, secs).unwrap(),
            summary: "edit".to_string(),
            timestamp_key: key.to_string(),
        }
    }

    #[test]
    fn test_list_most_recent_first() {
        let store = SnapshotStore::new();
        store.append(meta("f", 1, "20250830_142501"));
        store.append(meta("f", 3, "20250830_142503"));
        store.append(meta("f", 2, "20250830_142502"));

        let keys: Vec<String> = store
            .list(&FileId::from_string("f"))
            .into_iter()
            .map(|m| m.timestamp_key)
            .collect();
        assert_eq!(keys, vec!["20250830_142503", "20250830_142502", "20250830_142501"]);
    }

    #[test]
    fn test_same_second_ordered_by_counter() {
        let store = SnapshotStore::new();
        store.append(meta("f", 1, "20250830_142501"));
        store.append(meta("f", 1, "20250830_142501_2"));

        let latest = store.latest_record(&FileId::from_string("f")).unwrap();
        assert_eq!(latest.timestamp_key, "20250830_142501_2");
    }

    #[test]
    fn test_count_and_remove() {
        let store = SnapshotStore::new();
        let id = FileId::from_string("f");
        assert_eq!(store.count(&id), 0);
        store.append(meta("f", 1, "20250830_142501"));
        assert_eq!(store.count(&id), 1);
        store.remove(&id);
        assert_eq!(store.count(&id), 0);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("snapshots.bin");

        let store = SnapshotStore::new();
        store.append(meta("f", 1, "20250830_142501"));
        store.append(meta("g", 2, "20250830_142502"));
        store.save_to_file(&path).unwrap();

        let loaded = SnapshotStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.count(&FileId::from_string("f")), 1);
        assert_eq!(loaded.count(&FileId::from_string("g")), 1);
    }
}
