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

//! Merge planning: a pure reconciliation of two project listings.
//!
//! The planner computes, without any I/O, which destination folders a
//! merge will create and which (possibly renamed) files land in them. The
//! replicator then executes the plan against storage. Keeping the plan
//! pure makes the collision rules unit-testable without a backend.
//!
//! Folders are deduplicated **by name only**: the first folder seen with a
//! given name becomes the canonical destination for that name, and every
//! later folder sharing the name, from either source project, maps to it.
//! Files are processed in A-then-B listing order; per
//! `(filename, destination folder name)` the first occurrence keeps its
//! name and each subsequent one is renamed `<base>-v<N><ext>`.

use crate::error::{Result, VaultError};
use crate::id::{FileId, FolderId};
use crate::model::{topo_order, FileIdentity, Folder};
use crate::snapshot::versioned_filename;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How colliding names are reconciled during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReconcilePolicy {
    /// First occurrence keeps the name, later ones are renamed `-vN`.
    #[default]
    ByName,
    /// Like `ByName`, but a later file whose content hash matches an
    /// already-planned file with the same name is dropped instead of
    /// renamed (identical content is represented once).
    ByContentHash,
    /// Any name collision aborts the merge with `NameConflict`.
    Strict,
}

/// A file offered to the planner: its identity plus an optional content
/// hash (consulted only under `ByContentHash`).
#[derive(Debug, Clone)]
pub struct MergeFileInput {
    pub identity: FileIdentity,
    pub content_hash: Option<String>,
}

/// A destination folder the merge will create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFolder {
    pub name: String,
    /// Index of the parent within `MergePlan::folders`.
    pub parent: Option<usize>,
    /// Every origin folder (from either project) that maps here.
    pub sources: Vec<FolderId>,
}

/// A file the merge will copy, possibly under a new name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFile {
    pub source: FileId,
    pub origin_folder: FolderId,
    /// Index of the destination within `MergePlan::folders`.
    pub dest_folder: usize,
    pub filename: String,
    pub owner: String,
}

/// The complete, deterministic outcome of reconciling two listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergePlan {
    pub folders: Vec<PlannedFolder>,
    pub files: Vec<PlannedFile>,
}

impl MergePlan {
    /// Destination folder index for an origin folder id.
    pub fn dest_of(&self, origin: FolderId) -> Option<usize> {
        self.folders.iter().position(|f| f.sources.contains(&origin))
    }
}

/// Content hash used by the `ByContentHash` policy.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Reconcile the folder and file listings of projects A and B.
///
/// Guarantee: no two planned files in the same destination folder share a
/// filename, and (under `ByName`) every input file appears exactly once.
pub fn plan_merge(
    folders_a: &[Folder],
    folders_b: &[Folder],
    files_a: &[MergeFileInput],
    files_b: &[MergeFileInput],
    policy: ReconcilePolicy,
) -> Result<MergePlan> {
    let mut plan = MergePlan::default();

    // Destination index by name; origin folder id -> destination index.
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut folder_map: HashMap<FolderId, usize> = HashMap::new();

    for folder in topo_order(folders_a).into_iter().chain(topo_order(folders_b)) {
        if let Some(&idx) = by_name.get(&folder.name) {
            plan.folders[idx].sources.push(folder.id);
            folder_map.insert(folder.id, idx);
            continue;
        }

        let parent = folder.parent_id.and_then(|pid| folder_map.get(&pid).copied());
        let idx = plan.folders.len();
        plan.folders.push(PlannedFolder {
            name: folder.name.clone(),
            parent,
            sources: vec![folder.id],
        });
        by_name.insert(folder.name.clone(), idx);
        folder_map.insert(folder.id, idx);
    }

    // Occurrence counters per (filename, destination folder name), counted
    // in A-then-B processing order.
    let mut name_counts: HashMap<(String, String), u32> = HashMap::new();
    // Hashes already planned per (filename, destination), for ByContentHash.
    let mut planned_hashes: HashMap<(String, usize), Vec<String>> = HashMap::new();

    for input in files_a.iter().chain(files_b.iter()) {
        let file = &input.identity;
        let dest = folder_map.get(&file.folder_id).copied().ok_or_else(|| {
            VaultError::invalid_ref(format!(
                "file {} references folder {} outside the merge inputs",
                file.filename, file.folder_id
            ))
        })?;
        let dest_name = plan.folders[dest].name.clone();

        if policy == ReconcilePolicy::ByContentHash {
            if let Some(hash) = &input.content_hash {
                let seen = planned_hashes
                    .entry((file.filename.clone(), dest))
                    .or_default();
                if seen.contains(hash) {
                    continue;
                }
                seen.push(hash.clone());
            }
        }

        let key = (file.filename.clone(), dest_name);
        let version = name_counts.get(&key).copied().unwrap_or(0) + 1;
        name_counts.insert(key, version);

        if version > 1 && policy == ReconcilePolicy::Strict {
            return Err(VaultError::NameConflict(format!(
                "{} already exists in folder {}",
                file.filename, plan.folders[dest].name
            )));
        }

        let filename = if version == 1 {
            file.filename.clone()
        } else {
            versioned_filename(&file.filename, version)
        };

        plan.files.push(PlannedFile {
            source: file.id.clone(),
            origin_folder: file.folder_id,
            dest_folder: dest,
            filename,
            owner: file.owner.clone(),
        });
    }

    Ok(plan)
}
