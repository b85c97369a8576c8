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

//! Error types shared across the engine.
//!
//! The version manager and diff engine surface these untouched; the
//! replicator catches per-item errors during fork (skip-and-continue) and
//! propagates the first error during merge (abort-whole-operation).

use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum VaultError {
    /// Missing file, folder, project, or snapshot
    #[error("not found: {0}")]
    NotFound(String),

    /// Blob read/write failure in the storage tier
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),

    /// Folder/project reference does not resolve
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Two entries would share a name under a strict merge policy.
    /// Auto-resolving policies rename instead and never surface this.
    #[error("name conflict: {0}")]
    NameConflict(String),

    /// Index or metadata (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Shorthand for a `NotFound` with a formatted message.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for an `InvalidReference` with a formatted message.
    pub fn invalid_ref(what: impl Into<String>) -> Self {
        Self::InvalidReference(what.into())
    }
}
