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

//! Source language detection by filename extension.
//!
//! Execution sandboxes are routed per language by an external collaborator;
//! this closed enum is the routing key so an unsupported extension is a
//! compile-time-checked `Unknown` case rather than a missing entry in a
//! string map.

use serde::{Deserialize, Serialize};

/// Languages with a registered execution sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
    JavaScript,
    Ruby,
    /// No sandbox registered for this extension.
    Unknown,
}

impl Default for Language {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Language {
    /// Map a filename extension (with or without the leading dot) to a
    /// language.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.') {
            "c" => Self::C,
            "cpp" | "cc" | "cxx" => Self::Cpp,
            "java" => Self::Java,
            "py" => Self::Python,
            "js" => Self::JavaScript,
            "rb" => Self::Ruby,
            _ => Self::Unknown,
        }
    }

    /// Map a filename to a language via its extension.
    pub fn from_filename(filename: &str) -> Self {
        Self::from_extension(crate::snapshot::extension(filename))
    }

    /// Canonical lowercase name, as used in sandbox routing.
    pub fn key(&self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Python => "python",
            Self::JavaScript => "js",
            Self::Ruby => "ruby",
            Self::Unknown => "unknown",
        }
    }

    /// Whether an execution sandbox exists for this language.
    pub fn executable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// All routable languages.
    pub fn all() -> &'static [Language] {
        &[
            Self::C,
            Self::Cpp,
            Self::Java,
            Self::Python,
            Self::JavaScript,
            Self::Ruby,
        ]
    }
}
