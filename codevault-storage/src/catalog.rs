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

//! Catalog of project, folder, and file-identity records.
//!
//! This is the narrow in-process stand-in for the relational store the
//! engine's callers would normally provide. Listings are returned in a
//! deterministic order (allocation order for folders, creation order for
//! files) because the merge planner's collision counters depend on it.

use codevault_core::{
    FileId, FileIdentity, Folder, FolderId, Project, ProjectId, Result, VaultError,
};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// In-memory record store with optional bincode persistence.
pub struct Catalog {
    projects: DashMap<ProjectId, Project>,
    folders: DashMap<FolderId, Folder>,
    files: DashMap<FileId, FileIdentity>,
    next_project: AtomicU64,
    next_folder: AtomicU64,
    /// Serializes identity creation so two concurrent `ensure_file` calls
    /// for the same (filename, folder) resolve to one identity.
    ensure_lock: Mutex<()>,
}

/// Serialized form of the catalog for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogSnapshot {
    projects: Vec<Project>,
    folders: Vec<Folder>,
    files: Vec<FileIdentity>,
    next_project: u64,
    next_folder: u64,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            folders: DashMap::new(),
            files: DashMap::new(),
            next_project: AtomicU64::new(1),
            next_folder: AtomicU64::new(1),
            ensure_lock: Mutex::new(()),
        }
    }

    // === Projects ===

    /// Create a project record.
    pub fn create_project(&self, name: &str, owner: &str) -> Project {
        let id = ProjectId(self.next_project.fetch_add(1, Ordering::SeqCst));
        let project = Project {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
            created_at: Utc::now(),
        };
        self.projects.insert(id, project.clone());
        debug!(%id, name, "project created");
        project
    }

    /// Look up a project.
    pub fn project(&self, id: ProjectId) -> Result<Project> {
        self.projects
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| VaultError::not_found(format!("project {id}")))
    }

    /// Remove a project and every folder and file identity under it.
    /// Returns the removed project; the caller cascades storage removal.
    pub fn delete_project(&self, id: ProjectId) -> Result<Project> {
        let (_, project) = self
            .projects
            .remove(&id)
            .ok_or_else(|| VaultError::not_found(format!("project {id}")))?;

        let folder_ids: Vec<FolderId> = self
            .folders
            .iter()
            .filter(|f| f.project_id == id)
            .map(|f| f.id)
            .collect();
        for fid in &folder_ids {
            self.folders.remove(fid);
        }
        let file_ids: Vec<FileId> = self
            .files
            .iter()
            .filter(|f| folder_ids.contains(&f.folder_id))
            .map(|f| f.id.clone())
            .collect();
        for fid in &file_ids {
            self.files.remove(fid);
        }
        debug!(%id, folders = folder_ids.len(), files = file_ids.len(), "project deleted");
        Ok(project)
    }

    // === Folders ===

    /// Create a folder. The project and (when given) the parent folder
    /// must resolve, and the parent must belong to the same project.
    pub fn create_folder(
        &self,
        name: &str,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
    ) -> Result<Folder> {
        if !self.projects.contains_key(&project_id) {
            return Err(VaultError::invalid_ref(format!("project {project_id}")));
        }
        if let Some(pid) = parent_id {
            let parent = self
                .folders
                .get(&pid)
                .ok_or_else(|| VaultError::invalid_ref(format!("parent folder {pid}")))?;
            if parent.project_id != project_id {
                return Err(VaultError::invalid_ref(format!(
                    "parent folder {pid} belongs to project {}",
                    parent.project_id
                )));
            }
        }

        let id = FolderId(self.next_folder.fetch_add(1, Ordering::SeqCst));
        let folder = Folder { id, name: name.to_string(), project_id, parent_id };
        self.folders.insert(id, folder.clone());
        Ok(folder)
    }

    /// Look up a folder.
    pub fn folder(&self, id: FolderId) -> Result<Folder> {
        self.folders
            .get(&id)
            .map(|f| f.clone())
            .ok_or_else(|| VaultError::not_found(format!("folder {id}")))
    }

    /// All folders of a project, in allocation order.
    pub fn folders_in_project(&self, project_id: ProjectId) -> Vec<Folder> {
        let mut folders: Vec<Folder> = self
            .folders
            .iter()
            .filter(|f| f.project_id == project_id)
            .map(|f| f.clone())
            .collect();
        folders.sort_by_key(|f| f.id);
        folders
    }

    // === File identities ===

    /// Return the existing identity for `(filename, folder_id)` or create
    /// a new one. Creation has no storage side effect; the snapshot
    /// directory is made lazily by the first save.
    pub fn ensure_file(
        &self,
        filename: &str,
        folder_id: FolderId,
        owner: &str,
    ) -> Result<FileIdentity> {
        if !self.folders.contains_key(&folder_id) {
            return Err(VaultError::invalid_ref(format!("folder {folder_id}")));
        }

        let _guard = self.ensure_lock.lock();
        if let Some(existing) = self
            .files
            .iter()
            .find(|f| f.folder_id == folder_id && f.filename == filename)
        {
            return Ok(existing.clone());
        }

        let identity = FileIdentity {
            id: FileId::generate(),
            filename: filename.to_string(),
            folder_id,
            owner: owner.to_string(),
            created_at: Utc::now(),
        };
        self.files.insert(identity.id.clone(), identity.clone());
        debug!(file_id = %identity.id, filename, %folder_id, "file identity created");
        Ok(identity)
    }

    /// Look up a file identity.
    pub fn file(&self, id: &FileId) -> Result<FileIdentity> {
        self.files
            .get(id)
            .map(|f| f.clone())
            .ok_or_else(|| VaultError::not_found(format!("file {id}")))
    }

    /// All file identities in a folder, in creation order.
    pub fn files_in_folder(&self, folder_id: FolderId) -> Vec<FileIdentity> {
        let mut files: Vec<FileIdentity> = self
            .files
            .iter()
            .filter(|f| f.folder_id == folder_id)
            .map(|f| f.clone())
            .collect();
        files.sort_by(|a, b| {
            (a.created_at, &a.filename, &a.id).cmp(&(b.created_at, &b.filename, &b.id))
        });
        files
    }

    /// All file identities of a project, grouped by folder allocation
    /// order and then file creation order.
    pub fn files_in_project(&self, project_id: ProjectId) -> Vec<FileIdentity> {
        self.folders_in_project(project_id)
            .iter()
            .flat_map(|f| self.files_in_folder(f.id))
            .collect()
    }

    /// Project that a folder belongs to.
    pub fn project_of_folder(&self, folder_id: FolderId) -> Result<ProjectId> {
        Ok(self.folder(folder_id)?.project_id)
    }

    // === Persistence ===

    /// Save the catalog to a bincode file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let snapshot = CatalogSnapshot {
            projects: self.projects.iter().map(|p| p.clone()).collect(),
            folders: self.folders.iter().map(|f| f.clone()).collect(),
            files: self.files.iter().map(|f| f.clone()).collect(),
            next_project: self.next_project.load(Ordering::SeqCst),
            next_folder: self.next_folder.load(Ordering::SeqCst),
        };
        let data = bincode::serialize(&snapshot)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load a catalog from a bincode file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let snapshot: CatalogSnapshot = bincode::deserialize(&data)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;

        let catalog = Self::new();
        for project in snapshot.projects {
            catalog.projects.insert(project.id, project);
        }
        for folder in snapshot.folders {
            catalog.folders.insert(folder.id, folder);
        }
        for file in snapshot.files {
            catalog.files.insert(file.id.clone(), file);
        }
        catalog.next_project.store(snapshot.next_project, Ordering::SeqCst);
        catalog.next_folder.store(snapshot.next_folder, Ordering::SeqCst);
        Ok(catalog)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
