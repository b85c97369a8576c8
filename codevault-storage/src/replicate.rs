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

//! Project replication: fork, merge, and archive.
//!
//! Fork copies one project wholesale; merge reconciles two projects into
//! a third via the pure planner in `codevault_core::merge_plan`. The two
//! handle per-file failures differently: a fork skips the failing file
//! and keeps going (a partial fork is still useful), a merge aborts on
//! the first error because a merged project missing arbitrary files is
//! not. Both copy only the **latest** snapshot of each file; history does
//! not replicate.

use crate::catalog::Catalog;
use crate::version::FileVersionManager;
use codevault_core::{
    content_hash, plan_merge, topo_order, FileIdentity, FolderId, MergeFileInput, Project,
    ProjectId, ReconcilePolicy, Result, VaultError,
};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Executes fork, merge, and archive against the catalog and version
/// manager.
pub struct ProjectReplicator {
    catalog: Arc<Catalog>,
    versions: Arc<FileVersionManager>,
}

impl ProjectReplicator {
    pub fn new(catalog: Arc<Catalog>, versions: Arc<FileVersionManager>) -> Self {
        Self { catalog, versions }
    }

    /// Fork a project into a new one named `<name>-fork`.
    ///
    /// Every folder is recreated parent-first; every file's latest
    /// snapshot is copied as the initial snapshot of a fresh identity. A
    /// file that fails to copy (most commonly because it has no snapshot
    /// yet) is skipped with a warning and the fork continues.
    pub fn fork(&self, source_id: ProjectId, owner: &str) -> Result<Project> {
        let source = self.catalog.project(source_id)?;
        let fork = self
            .catalog
            .create_project(&format!("{}-fork", source.name), owner);

        let folders = self.catalog.folders_in_project(source_id);
        let mut folder_map: HashMap<FolderId, FolderId> = HashMap::new();
        let summary = format!("forked from project {source_id}");
        let mut copied = 0usize;

        for folder in topo_order(&folders) {
            let parent = folder.parent_id.and_then(|p| folder_map.get(&p).copied());
            let created = self.catalog.create_folder(&folder.name, fork.id, parent)?;
            folder_map.insert(folder.id, created.id);

            for file in self.catalog.files_in_folder(folder.id) {
                match self.copy_file(&file, created.id, owner, &summary) {
                    Ok(()) => copied += 1,
                    Err(e) => {
                        warn!(file_id = %file.id, filename = %file.filename, error = %e,
                            "skipping file during fork");
                    }
                }
            }
        }

        info!(source = %source_id, fork = %fork.id, files = copied, "project forked");
        Ok(fork)
    }

    /// Merge two projects into a new one named `<A> + <B>`.
    ///
    /// Folders are unioned by name and files reconciled per `policy`; see
    /// the planner for the collision rules. Unlike fork, any failure
    /// aborts the merge, leaving already-copied files behind in the
    /// half-built project.
    pub fn merge(
        &self,
        a_id: ProjectId,
        b_id: ProjectId,
        owner: &str,
        policy: ReconcilePolicy,
    ) -> Result<Project> {
        let a = self.catalog.project(a_id)?;
        let b = self.catalog.project(b_id)?;

        let folders_a = self.catalog.folders_in_project(a_id);
        let folders_b = self.catalog.folders_in_project(b_id);

        let mut contents: HashMap<codevault_core::FileId, Vec<u8>> = HashMap::new();
        let files_a = self.merge_inputs(a_id, policy, &mut contents)?;
        let files_b = self.merge_inputs(b_id, policy, &mut contents)?;

        let plan = plan_merge(&folders_a, &folders_b, &files_a, &files_b, policy)?;

        let merged = self
            .catalog
            .create_project(&format!("{} + {}", a.name, b.name), owner);

        // Planner emits folders parent-first, so each parent index is
        // already materialized when its children arrive.
        let mut created: Vec<FolderId> = Vec::with_capacity(plan.folders.len());
        for planned in &plan.folders {
            let parent = planned.parent.map(|i| created[i]);
            let folder = self.catalog.create_folder(&planned.name, merged.id, parent)?;
            created.push(folder.id);
        }

        for planned in &plan.files {
            let target = self.versions.ensure_file(
                &planned.filename,
                created[planned.dest_folder],
                &planned.owner,
            )?;
            // A file with no snapshot still gets its identity; there is
            // just no content to copy.
            if let Some(content) = contents.get(&planned.source) {
                let summary = format!("merged from project {}", planned.origin_folder);
                self.versions.save(&target.id, content, &planned.owner, &summary)?;
            }
        }

        info!(
            a = %a_id, b = %b_id, merged = %merged.id, files = plan.files.len(),
            "projects merged"
        );
        Ok(merged)
    }

    /// Archive a project's latest contents as a zip, one entry per file
    /// at `<folder name>/<filename>`. A file with no snapshot yet gets an
    /// empty entry.
    pub fn archive(&self, project_id: ProjectId) -> Result<Vec<u8>> {
        self.catalog.project(project_id)?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for folder in self.catalog.folders_in_project(project_id) {
            for file in self.catalog.files_in_folder(folder.id) {
                let content = match self.versions.latest(&file.id) {
                    Ok((_, content)) => content,
                    Err(VaultError::NotFound(_)) => {
                        warn!(file_id = %file.id, filename = %file.filename,
                            "no snapshot, archiving empty entry");
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };
                writer
                    .start_file(format!("{}/{}", folder.name, file.filename), options)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?;
                writer.write_all(&content)?;
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Copy one file's latest snapshot into a destination folder as a new
    /// identity's initial snapshot.
    fn copy_file(
        &self,
        source: &FileIdentity,
        dest_folder: FolderId,
        owner: &str,
        summary: &str,
    ) -> Result<()> {
        let (_, content) = self.versions.latest(&source.id)?;
        let target = self.versions.ensure_file(&source.filename, dest_folder, owner)?;
        self.versions.save(&target.id, &content, owner, summary)?;
        Ok(())
    }

    /// Stage a project's files for the planner: latest content per file,
    /// hashed when the policy compares content. A file with no snapshot
    /// is still offered (it occupies a name in its destination folder),
    /// with no content staged.
    fn merge_inputs(
        &self,
        project_id: ProjectId,
        policy: ReconcilePolicy,
        contents: &mut HashMap<codevault_core::FileId, Vec<u8>>,
    ) -> Result<Vec<MergeFileInput>> {
        let mut inputs = Vec::new();
        for file in self.catalog.files_in_project(project_id) {
            let hash = match self.versions.latest(&file.id) {
                Ok((_, content)) => {
                    let hash = match policy {
                        ReconcilePolicy::ByContentHash => Some(content_hash(&content)),
                        _ => None,
                    };
                    contents.insert(file.id.clone(), content);
                    hash
                }
                Err(VaultError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            inputs.push(MergeFileInput { identity: file, content_hash: hash });
        }
        Ok(inputs)
    }
}
