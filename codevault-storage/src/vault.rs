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

//! Vault: the wired-up engine.
//!
//! Opens the blob gateway at the configured root, loads the catalog and
//! snapshot index persisted next to the blobs (fresh stores when absent),
//! and hands out the version manager, differ, and replicator that share
//! them. Blobs are durable as soon as a save returns; the indexes are
//! durable after [`Vault::persist`], which callers run on shutdown or
//! after any batch of mutations they need to survive a restart.

use crate::catalog::Catalog;
use crate::diff::SnapshotDiffer;
use crate::gateway::BlobGateway;
use crate::replicate::ProjectReplicator;
use crate::snapshot_store::SnapshotStore;
use crate::version::FileVersionManager;
use codevault_core::{Project, ProjectId, Result, StorageConfig};
use std::sync::Arc;
use tracing::info;

const CATALOG_INDEX: &str = "catalog.bin";
const SNAPSHOT_INDEX: &str = "snapshots.bin";

/// Facade owning every engine component over one storage root.
pub struct Vault {
    gateway: Arc<BlobGateway>,
    catalog: Arc<Catalog>,
    snapshots: Arc<SnapshotStore>,
    versions: Arc<FileVersionManager>,
    differ: SnapshotDiffer,
    replicator: ProjectReplicator,
}

impl Vault {
    /// Open (or create) a vault at the configured root.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let gateway = Arc::new(BlobGateway::open(config)?);

        let catalog_path = gateway.index_path(CATALOG_INDEX);
        let catalog = Arc::new(if catalog_path.is_file() {
            Catalog::load_from_file(&catalog_path)?
        } else {
            Catalog::new()
        });

        let snapshot_path = gateway.index_path(SNAPSHOT_INDEX);
        let snapshots = Arc::new(if snapshot_path.is_file() {
            SnapshotStore::load_from_file(&snapshot_path)?
        } else {
            SnapshotStore::new()
        });

        let versions = Arc::new(FileVersionManager::new(
            gateway.clone(),
            catalog.clone(),
            snapshots.clone(),
        ));
        let differ = SnapshotDiffer::new(versions.clone());
        let replicator = ProjectReplicator::new(catalog.clone(), versions.clone());

        info!(root = %config.root.display(), "vault opened");
        Ok(Self { gateway, catalog, snapshots, versions, differ, replicator })
    }

    /// Write the catalog and snapshot indexes next to the blobs.
    pub fn persist(&self) -> Result<()> {
        self.catalog.save_to_file(&self.gateway.index_path(CATALOG_INDEX))?;
        self.snapshots.save_to_file(&self.gateway.index_path(SNAPSHOT_INDEX))?;
        Ok(())
    }

    /// Create a project and its blob directory.
    pub fn create_project(&self, name: &str, owner: &str) -> Result<Project> {
        let project = self.catalog.create_project(name, owner);
        self.gateway.create_dir(&project.id.to_string())?;
        Ok(project)
    }

    /// Delete a project: its catalog records, snapshot index entries, and
    /// the blob tree under `<project id>/`.
    pub fn delete_project(&self, id: ProjectId) -> Result<()> {
        let files = self.catalog.files_in_project(id);
        self.catalog.delete_project(id)?;
        for file in &files {
            self.snapshots.remove(&file.id);
        }
        self.gateway.delete_dir(&id.to_string())?;
        info!(%id, files = files.len(), "project deleted");
        Ok(())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn versions(&self) -> &FileVersionManager {
        &self.versions
    }

    pub fn differ(&self) -> &SnapshotDiffer {
        &self.differ
    }

    pub fn replicator(&self) -> &ProjectReplicator {
        &self.replicator
    }
}
