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

//! Per-load source metadata: the identity card handed to the converters.
//!
//! A [`SourceMetadata`] is built fresh on every resolution and consumed by
//! exactly one import/process call. Converters read the resolved facts
//! (physical path, bucket, side-channel blocks) and record the files the
//! asset depends on through [`SourceMetadata::add_dependency`]; the content
//! manager harvests that list afterwards to rebuild the dependency graph.

use crate::density::DensityBucket;
use crate::path::AssetPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the asset's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// A file on disk, opened and fully consumed inside the import call.
    File,
    /// A caller-provided byte stream.
    Stream,
    /// Bytes already resident in memory.
    InMemory,
}

/// Everything the converters need to know about one resolved source.
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    /// The logical path the caller asked for.
    pub logical_path: AssetPath,
    /// The physical file the resolver settled on.
    pub physical_path: PathBuf,
    /// File name of `physical_path`, including extension.
    pub file_name: String,
    /// Extension of `physical_path`, without the dot. Drives importer
    /// dispatch.
    pub extension: String,
    /// The override directory that supplied the file, or `None` when it
    /// came from the base content root.
    pub override_origin: Option<PathBuf>,
    /// Where the bytes come from.
    pub source_kind: SourceKind,
    /// True when the file was found in a configured fallback (developer
    /// tree) root rather than the packaged content.
    pub from_dev_tree: bool,
    /// The density bucket the resolution was performed for. Note this is
    /// the *requested* tier; the physical file may be a lower-bucket
    /// substitute.
    pub bucket: DensityBucket,
    /// Importer-specific key/value block from a wrapper file, if any.
    pub importer_data: BTreeMap<String, String>,
    /// Processor-specific key/value block from a wrapper file, if any.
    pub processor_data: BTreeMap<String, String>,
    dependencies: Vec<(PathBuf, DensityBucket)>,
}

impl SourceMetadata {
    /// Builds metadata for a resolved file. `file_name` and `extension`
    /// are derived from `physical_path`.
    pub fn new(logical_path: AssetPath, physical_path: PathBuf, bucket: DensityBucket) -> Self {
        let file_name = physical_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = physical_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            logical_path,
            physical_path,
            file_name,
            extension,
            override_origin: None,
            source_kind: SourceKind::File,
            from_dev_tree: false,
            bucket,
            importer_data: BTreeMap::new(),
            processor_data: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Declares that this asset depends on `file`. Recorded under the
    /// bucket the load was performed for; duplicate declarations collapse.
    pub fn add_dependency(&mut self, file: impl Into<PathBuf>) {
        let file = file.into();
        if !self.dependencies.iter().any(|(f, _)| *f == file) {
            self.dependencies.push((file, self.bucket));
        }
    }

    /// The dependency files declared so far, with the bucket each was
    /// recorded under.
    pub fn dependencies(&self) -> &[(PathBuf, DensityBucket)] {
        &self.dependencies
    }

    /// Convenience: the directory containing the physical file.
    pub fn directory(&self) -> &Path {
        self.physical_path.parent().unwrap_or(Path::new(""))
    }
}
