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

//! Catalog records: projects, folders, file identities.
//!
//! Folders form a forest rooted at `parent_id = None`. Operations that
//! assume parent-before-child order (fork's folder recreation, merge's
//! folder union) must go through [`topo_order`] first; folder records are
//! treated as a flat arena, never walked through parent back-pointers.

use crate::id::{FileId, FolderId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project: the unit of forking, merging, and archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// A folder within a project. Names need not be globally unique; the
/// replicator enforces per-project uniqueness when reconciling a merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub project_id: ProjectId,
    pub parent_id: Option<FolderId>,
}

/// The stable identity of a logical file.
///
/// Invariant: within one folder there is at most one live identity per
/// filename at any time; `Catalog::ensure_file` resolves reuse to the
/// existing identity. Creation has no storage side effect, the snapshot
/// directory is created lazily on first save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIdentity {
    pub id: FileId,
    pub filename: String,
    pub folder_id: FolderId,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// Order folders so that every parent precedes its children.
///
/// Runs repeated passes over the arena, emitting folders whose parent is
/// either absent or already emitted. Folders whose parent never resolves
/// (dangling reference, or a cycle introduced by corrupted records) are
/// appended at the end so the pass always terminates; the caller decides
/// whether to treat them as roots.
pub fn topo_order(folders: &[Folder]) -> Vec<&Folder> {
    let mut ordered: Vec<&Folder> = Vec::with_capacity(folders.len());
    let mut placed = vec![false; folders.len()];
    let mut remaining = folders.len();

    while remaining > 0 {
        let mut progressed = false;
        for (i, folder) in folders.iter().enumerate() {
            if placed[i] {
                continue;
            }
            let parent_ready = match folder.parent_id {
                None => true,
                Some(pid) => ordered.iter().any(|f| f.id == pid)
                    || !folders.iter().any(|f| f.id == pid),
            };
            if parent_ready {
                ordered.push(folder);
                placed[i] = true;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            // Cycle: emit the rest in arena order.
            for (i, folder) in folders.iter().enumerate() {
                if !placed[i] {
                    ordered.push(folder);
                }
            }
            break;
        }
    }

    ordered
}
