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

//! Codevault Core
//!
//! Domain types for the snapshot versioning and project-replication
//! engine: identifiers, catalog records, the canonical snapshot naming
//! scheme, language routing, and the pure merge planner.

pub mod config;
pub mod error;
pub mod id;
pub mod language;
pub mod merge_plan;
pub mod model;
pub mod snapshot;

pub use config::StorageConfig;
pub use error::{Result, VaultError};
pub use id::{FileId, FolderId, ProjectId};
pub use language::Language;
pub use merge_plan::{
    content_hash, plan_merge, MergeFileInput, MergePlan, PlannedFile, PlannedFolder,
    ReconcilePolicy,
};
pub use model::{topo_order, FileIdentity, Folder, Project};
pub use snapshot::{
    counter_key, extension, file_dir_name, snapshot_dir, snapshot_name, timestamp_key_of,
    versioned_filename, SnapshotMetadata, TIMESTAMP_FORMAT,
};
