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

//! Codevault Storage
//!
//! The storage tier of the snapshot versioning and project-replication
//! engine. Layered bottom-up:
//!
//! - [`gateway`]: filesystem blob store rooted at one directory, the only
//!   module that touches snapshot blobs on disk.
//! - [`catalog`] and [`snapshot_store`]: in-memory record stores with
//!   bincode persistence, the indexes over what the gateway holds.
//! - [`version`]: the save/latest protocol, snapshot naming and
//!   per-file write serialization.
//! - [`diff`] and [`replicate`]: snapshot deltas, and fork/merge/archive
//!   built on the version manager.
//! - [`vault`]: the facade that wires the above over one storage root.

pub mod catalog;
pub mod diff;
pub mod gateway;
pub mod replicate;
pub mod snapshot_store;
pub mod vault;
pub mod version;

pub use catalog::Catalog;
pub use diff::{apply_edits, diff_lines, DiffKind, DiffRecord, SnapshotDiffer};
pub use gateway::BlobGateway;
pub use replicate::ProjectReplicator;
pub use snapshot_store::SnapshotStore;
pub use vault::Vault;
pub use version::FileVersionManager;
