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

//! The dependency graph driving cascading invalidation.
//!
//! For each loaded asset the graph records the physical files it declared
//! during import, and maintains the reverse index (file → dependent
//! logical paths) used when a watched file changes. Invariant: the reverse
//! index is always consistent with the forward map — a clear removes the
//! owner from every dependency's reverse entry before the forward record
//! goes away.

use ahash::{AHashMap, AHashSet};
use std::path::{Path, PathBuf};
use vellum_core::{AssetPath, DensityBucket};

/// Forward and reverse dependency bookkeeping for one content manager.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: AHashMap<AssetPath, Vec<(PathBuf, DensityBucket)>>,
    reverse: AHashMap<PathBuf, AHashSet<AssetPath>>,
}

impl DependencyGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `owner` depends on the physical file `file`, under the
    /// bucket the load was performed for. Duplicate records collapse.
    pub fn add_dependency(&mut self, owner: &AssetPath, file: &Path, bucket: DensityBucket) {
        let record = self.forward.entry(owner.clone()).or_default();
        if !record.iter().any(|(f, _)| f == file) {
            record.push((file.to_path_buf(), bucket));
        }
        self.reverse
            .entry(file.to_path_buf())
            .or_default()
            .insert(owner.clone());
    }

    /// Drops every dependency record owned by `owner`, scrubbing the
    /// reverse index first.
    pub fn clear_dependencies(&mut self, owner: &AssetPath) {
        let Some(record) = self.forward.remove(owner) else {
            return;
        };
        for (file, _) in record {
            if let Some(dependents) = self.reverse.get_mut(&file) {
                dependents.remove(owner);
                if dependents.is_empty() {
                    self.reverse.remove(&file);
                }
            }
        }
    }

    /// Replaces `owner`'s dependency set in one step.
    pub fn set_dependencies<'a>(
        &mut self,
        owner: &AssetPath,
        files: impl IntoIterator<Item = &'a (PathBuf, DensityBucket)>,
    ) {
        self.clear_dependencies(owner);
        for (file, bucket) in files {
            self.add_dependency(owner, file, *bucket);
        }
    }

    /// The files `owner` currently depends on.
    pub fn dependencies_of(&self, owner: &AssetPath) -> &[(PathBuf, DensityBucket)] {
        self.forward.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reverse lookup: every logical path depending on `file`, with the
    /// bucket each recorded the dependency under. Sorted for deterministic
    /// cascade order.
    pub fn dependents_of_file(&self, file: &Path) -> Vec<(AssetPath, DensityBucket)> {
        let Some(owners) = self.reverse.get(file) else {
            return Vec::new();
        };
        let mut out: Vec<(AssetPath, DensityBucket)> = owners
            .iter()
            .filter_map(|owner| {
                self.forward
                    .get(owner)
                    .and_then(|record| record.iter().find(|(f, _)| f == file))
                    .map(|(_, bucket)| (owner.clone(), *bucket))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Whether any asset depends on `file`.
    pub fn is_dependency(&self, file: &Path) -> bool {
        self.reverse.get(file).is_some_and(|d| !d.is_empty())
    }
}
