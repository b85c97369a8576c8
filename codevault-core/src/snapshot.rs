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

//! Snapshot metadata and the canonical naming scheme.
//!
//! # Naming
//!
//! ```text
//! <projectId>/<fileId>-<filename with dots as dashes>/<fileId>_<yyyyMMdd_HHmmss>[_N]<ext>
//! ```
//!
//! The timestamp format sorts lexicographically identically to
//! chronological order, so "latest" is simply the lexicographically
//! greatest entry of a file's snapshot directory.
//!
//! Two saves of the same file within one second would collide under the
//! bare scheme; the second and later get a `_N` counter inserted before
//! the extension. `_` (0x5F) sorts after `.` (0x2E), so a suffixed name
//! still sorts after the bare name of the same second and before any name
//! of the following second, keeping the latest-is-max invariant.

use crate::id::{FileId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot timestamp format, e.g. `20250830_142501`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One record per saved version of a file.
///
/// The blob named by the snapshot key is the source of truth for content;
/// metadata is a secondary index for listing and authorship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub file_id: FileId,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    /// The timestamp portion of the snapshot's blob name, including any
    /// `_N` collision counter (e.g. `20250830_142501_2`).
    pub timestamp_key: String,
}

impl SnapshotMetadata {
    /// Format a timestamp into the bare (counter-free) key.
    pub fn format_timestamp(ts: DateTime<Utc>) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Extension of a filename, including the leading dot. Empty when the
/// filename has no dot.
pub fn extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) => &filename[idx..],
        None => "",
    }
}

/// Directory name for a file's snapshots: `<fileId>-<filename>` with the
/// filename's dots replaced by dashes (e.g. `a1b2-main-py`).
pub fn file_dir_name(file_id: &FileId, filename: &str) -> String {
    format!("{}-{}", file_id, filename.replace('.', "-"))
}

/// Relative snapshot directory for a file: `<projectId>/<fileDirName>`.
pub fn snapshot_dir(project_id: ProjectId, file_id: &FileId, filename: &str) -> String {
    format!("{}/{}", project_id, file_dir_name(file_id, filename))
}

/// Blob name for one snapshot. `timestamp_key` is the formatted timestamp
/// plus any collision counter.
pub fn snapshot_name(file_id: &FileId, timestamp_key: &str, ext: &str) -> String {
    format!("{}_{}{}", file_id, timestamp_key, ext)
}

/// Timestamp key with a collision counter appended: `20250830_142501_2`.
pub fn counter_key(base_key: &str, counter: u32) -> String {
    format!("{}_{}", base_key, counter)
}

/// Extract the timestamp key back out of a snapshot blob name.
///
/// Returns `None` when the name does not belong to the given file.
pub fn timestamp_key_of(name: &str, file_id: &FileId, ext: &str) -> Option<String> {
    let prefix = format!("{}_", file_id);
    let rest = name.strip_prefix(&prefix)?;
    let rest = if ext.is_empty() { rest } else { rest.strip_suffix(ext)? };
    Some(rest.to_string())
}

/// Rename a filename for merge collision resolution by inserting a version
/// suffix before the extension: `main.py` -> `main-v2.py`.
pub fn versioned_filename(filename: &str, version: u32) -> String {
    match filename.rfind('.') {
        Some(idx) => format!("{}-v{}{}", &filename[..idx], version, &filename[idx..]),
        None => format!("{}-v{}", filename, version),
    }
}
