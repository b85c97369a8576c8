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

//! Diff engine: line-level deltas between two named snapshots of a file.
//!
//! Consumes only the version manager's snapshot-read capability. Output
//! is line granularity, a minimal LCS-based edit script; no character or
//! semantic diffing. A missing previous snapshot reads as empty content,
//! never an error. An absent previous *timestamp* means "this is the
//! initial snapshot" and yields a single sentinel record without touching
//! storage.

use crate::version::FileVersionManager;
use codevault_core::{FileId, Result, VaultError};
use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};
use std::sync::Arc;

/// Kind of edit a [`DiffRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Sentinel: the current snapshot is the file's first, there is no
    /// previous version to compare.
    Initial,
    Insert,
    Delete,
    Change,
}

/// One line-range edit between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub kind: DiffKind,
    /// 0-based line position in the previous snapshot where the edit
    /// applies.
    pub position: usize,
    pub removed_lines: Vec<String>,
    pub added_lines: Vec<String>,
}

impl DiffRecord {
    /// The initial-snapshot sentinel.
    pub fn initial() -> Self {
        Self {
            kind: DiffKind::Initial,
            position: 0,
            removed_lines: Vec::new(),
            added_lines: Vec::new(),
        }
    }
}

/// Computes deltas by reading snapshots through the version manager.
pub struct SnapshotDiffer {
    versions: Arc<FileVersionManager>,
}

impl SnapshotDiffer {
    pub fn new(versions: Arc<FileVersionManager>) -> Self {
        Self { versions }
    }

    /// Delta from the snapshot at `previous` to the one at `current`,
    /// both addressed by timestamp key.
    pub fn diff(
        &self,
        file_id: &FileId,
        previous: Option<&str>,
        current: &str,
    ) -> Result<Vec<DiffRecord>> {
        let Some(previous) = previous else {
            return Ok(vec![DiffRecord::initial()]);
        };

        let old = match self.versions.read_snapshot(file_id, previous) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(VaultError::NotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };
        let new_bytes = self.versions.read_snapshot(file_id, current)?;
        let new = String::from_utf8_lossy(&new_bytes).into_owned();

        Ok(diff_lines(&old, &new))
    }
}

/// Split on `\n`, `\r\n`, or lone `\r`, without terminators.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Minimal line-level edit script from `old` to `new`.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffRecord> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let diff = TextDiff::from_slices(&old_lines, &new_lines);

    let mut records = Vec::new();
    // `ops()` need not be monotonic in old coordinates: an insert can
    // carry an old index lower than lines already consumed by a preceding
    // equal run. The cursor keeps recorded positions in replay order so
    // `apply_edits` reproduces the new lines.
    let mut cursor = 0usize;
    for op in diff.ops() {
        let kind = match op.tag() {
            DiffTag::Equal => {
                cursor = cursor.max(op.old_range().end);
                continue;
            }
            DiffTag::Delete => DiffKind::Delete,
            DiffTag::Insert => DiffKind::Insert,
            DiffTag::Replace => DiffKind::Change,
        };
        let removed: Vec<String> =
            old_lines[op.old_range()].iter().map(|s| s.to_string()).collect();
        let added: Vec<String> =
            new_lines[op.new_range()].iter().map(|s| s.to_string()).collect();
        let position = cursor.max(op.old_range().start);
        cursor = position + removed.len();
        records.push(DiffRecord { kind, position, removed_lines: removed, added_lines: added });
    }
    records
}

/// Apply an edit script to the previous snapshot's lines, reconstructing
/// the current snapshot's lines. Records must be in the order produced by
/// [`diff_lines`].
pub fn apply_edits(old_lines: &[String], records: &[DiffRecord]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for record in records {
        while cursor < record.position && cursor < old_lines.len() {
            out.push(old_lines[cursor].clone());
            cursor += 1;
        }
        match record.kind {
            DiffKind::Initial => {}
            DiffKind::Insert => out.extend(record.added_lines.iter().cloned()),
            DiffKind::Delete => cursor += record.removed_lines.len(),
            DiffKind::Change => {
                cursor += record.removed_lines.len();
                out.extend(record.added_lines.iter().cloned());
            }
        }
    }
    out.extend(old_lines[cursor.min(old_lines.len())..].iter().cloned());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::gateway::BlobGateway;
    use crate::snapshot_store::SnapshotStore;
    use codevault_core::StorageConfig;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_vs_empty_is_empty() {
        assert!(diff_lines("", "").is_empty());
    }

    #[test]
    fn test_identical_is_empty() {
        assert!(diff_lines("a\nb\n", "a\nb\n").is_empty());
    }

    #[test]
    fn test_insert() {
        let records = diff_lines("a\nc\n", "a\nb\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Insert);
        assert_eq!(records[0].position, 1);
        assert_eq!(records[0].added_lines, owned(&["b"]));
        assert!(records[0].removed_lines.is_empty());
    }

    #[test]
    fn test_delete() {
        let records = diff_lines("a\nb\nc\n", "a\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Delete);
        assert_eq!(records[0].position, 1);
        assert_eq!(records[0].removed_lines, owned(&["b"]));
    }

    #[test]
    fn test_change() {
        let records = diff_lines("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Change);
        assert_eq!(records[0].removed_lines, owned(&["b"]));
        assert_eq!(records[0].added_lines, owned(&["B"]));
    }

    #[test]
    fn test_mixed_newline_conventions() {
        let records = diff_lines("a\r\nb\r\n", "a\nb\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Insert);
        assert_eq!(records[0].added_lines, owned(&["c"]));
    }

    #[test]
    fn test_lone_carriage_return_newlines() {
        assert_eq!(split_lines("a\rb\rc"), vec!["a", "b", "c"]);
        assert!(diff_lines("a\rb\r", "a\nb\n").is_empty());

        let records = diff_lines("a\rb\r", "a\nb\nc\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Insert);
        assert_eq!(records[0].added_lines, owned(&["c"]));
    }

    #[test]
    fn test_insert_following_equal_run_keeps_replay_order() {
        // The underlying diff emits an insert whose old index trails the
        // equal run before it; positions must still replay in order.
        let old = ["aa", "", "aa", "", "aaa"].join("\n");
        let new = ["", "", "", "", "", "aaa", "aa", "aaa", "", "a", "a"].join("\n");

        let records = diff_lines(&old, &new);
        let mut last = 0;
        for record in &records {
            assert!(record.position >= last);
            last = record.position + record.removed_lines.len();
        }

        let old_lines: Vec<String> = split_lines(&old).iter().map(|s| s.to_string()).collect();
        assert_eq!(apply_edits(&old_lines, &records), split_lines(&new));
    }

    #[test]
    fn test_apply_reconstructs() {
        let old = "fn main() {\n    println!(\"hi\");\n}\n";
        let new = "fn main() {\n    let name = \"world\";\n    println!(\"hello {name}\");\n}\n";
        let records = diff_lines(old, new);
        let old_lines: Vec<String> = split_lines(old).iter().map(|s| s.to_string()).collect();
        let rebuilt = apply_edits(&old_lines, &records);
        assert_eq!(rebuilt, split_lines(new));
    }

    #[test]
    fn test_differ_sentinel_reads_nothing() {
        // A differ over an empty storage root: any blob read would fail,
        // so a sentinel result proves nothing was read.
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(BlobGateway::open(&StorageConfig::ephemeral(dir.path())).unwrap());
        let catalog = Arc::new(Catalog::new());
        let versions = Arc::new(FileVersionManager::new(
            gateway,
            catalog,
            Arc::new(SnapshotStore::new()),
        ));
        let differ = SnapshotDiffer::new(versions);

        let records = differ
            .diff(&FileId::from_string("ghost"), None, "20250830_142501")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Initial);
    }

    #[test]
    fn test_differ_missing_previous_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(BlobGateway::open(&StorageConfig::ephemeral(dir.path())).unwrap());
        let catalog = Arc::new(Catalog::new());
        let project = catalog.create_project("demo", "alice");
        let folder = catalog.create_folder("src", project.id, None).unwrap();
        let versions = Arc::new(FileVersionManager::new(
            gateway,
            catalog.clone(),
            Arc::new(SnapshotStore::new()),
        ));

        let file = versions.ensure_file("main.py", folder.id, "alice").unwrap();
        let meta = versions.save(&file.id, b"a\nb\n", "alice", "initial").unwrap();

        let differ = SnapshotDiffer::new(versions);
        let records = differ
            .diff(&file.id, Some("19990101_000000"), &meta.timestamp_key)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiffKind::Insert);
        assert_eq!(records[0].added_lines, owned(&["a", "b"]));
    }

    proptest! {
        // Diff round-trip: applying the edit script to the old lines
        // reconstructs the new lines exactly.
        #[test]
        fn prop_diff_roundtrip(
            old in proptest::collection::vec("[ab]{0,3}", 0..12),
            new in proptest::collection::vec("[ab]{0,3}", 0..12),
        ) {
            let old_text = old.join("\n");
            let new_text = new.join("\n");
            let records = diff_lines(&old_text, &new_text);
            let rebuilt = apply_edits(
                &split_lines(&old_text).iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                &records,
            );
            prop_assert_eq!(rebuilt, split_lines(&new_text));
        }
    }
}
