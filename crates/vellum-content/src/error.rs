// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The content manager's public error type.
//!
//! Resolution errors are always fatal to the requesting call and never
//! retried. Conversion errors are fatal on an initial load; on a watched
//! reload with a last-known-good value they are swallowed by the manager
//! and surface only through `validation_complete(validated = false)`.
//! Validation rejection is a policy decision, not an error, and never
//! appears here.

use std::path::PathBuf;
use thiserror::Error;
use vellum_core::{AssetPath, ConvertError, PathError};
use vellum_io::{CompiledError, ResolveError};

/// An error produced by a content-manager operation.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The logical path could not be resolved to a physical file.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An importer or processor rejected the source data.
    #[error("Conversion failed for '{path}'")]
    Convert {
        /// The logical path being loaded.
        path: AssetPath,
        /// The underlying conversion error.
        #[source]
        source: ConvertError,
    },

    /// A precompiled container failed to parse.
    #[error("Invalid precompiled container '{path}'")]
    Compiled {
        /// The container file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: CompiledError,
    },

    /// The filesystem failed while reading source bytes.
    #[error("I/O error reading '{path}'")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied path failed normalization.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A typed load found a value of a different type.
    #[error("Asset '{path}' holds a '{actual}', not a '{expected}'")]
    WrongType {
        /// The logical path that was loaded.
        path: AssetPath,
        /// The type the caller asked for.
        expected: &'static str,
        /// The type actually cached.
        actual: &'static str,
    },
}
