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

//! Storage configuration.
//!
//! The blob gateway root is process-wide and shared read/write across all
//! requests; callers never see paths outside it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the storage tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the blob store. All snapshot paths are relative
    /// to this directory.
    pub root: PathBuf,

    /// Flush blob writes to disk before acknowledging a save.
    /// Disable for tests where durability does not matter.
    pub fsync: bool,
}

impl StorageConfig {
    /// Config rooted at the given directory with durability enabled.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), fsync: true }
    }

    /// Config for tests: no fsync.
    pub fn ephemeral(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), fsync: false }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("codevault-data"), fsync: true }
    }
}
