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

//! The multi-version asset cache.
//!
//! Per logical path the cache holds a small set of instances keyed by
//! (density bucket, override origin), plus an independent opaque flag word.
//! Lookups do **not** normalize: callers pre-normalize through
//! [`AssetPath`], and two syntactically different spellings of the same
//! file are distinct entries on purpose — the manager never constructs
//! such keys, but code reaching in directly inherits that contract.
//!
//! The cache is a plain table. All mutation happens through `&mut self`
//! under the owning manager's mutex, and that lock is never held across
//! import/process execution.

use ahash::AHashMap;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use vellum_core::{AssetPath, DensityBucket, LoadedValue, SourceMetadata};

/// Opaque per-path annotations, stored independently of cached instances.
///
/// Combine with `|`: `AssetFlags::PINNED | AssetFlags::VOLATILE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AssetFlags {
    bits: u32,
}

impl AssetFlags {
    /// No annotations.
    pub const NONE: Self = Self { bits: 0 };
    /// The path survives a non-total purge.
    pub const PINNED: Self = Self { bits: 1 << 0 };
    /// The path's content is expected to change frequently.
    pub const VOLATILE: Self = Self { bits: 1 << 1 };

    /// Creates flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Whether every flag in `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }
}

impl BitOr for AssetFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One cached instance: the value plus the coordinates it was loaded under.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    /// The cached instance. Clones share the same underlying allocation.
    pub value: LoadedValue,
    /// The density bucket the load was performed for.
    pub bucket: DensityBucket,
    /// The override directory that supplied the file, `None` for the base
    /// root.
    pub origin: Option<PathBuf>,
}

/// The per-path slot map: at most one live instance per (bucket, origin).
#[derive(Debug, Default)]
pub struct CacheEntry {
    versions: Vec<CachedAsset>,
}

impl CacheEntry {
    /// The cached instance for `bucket`, regardless of origin. When a
    /// reload moved the path to a different override origin, the most
    /// recently stored slot wins.
    pub fn version(&self, bucket: DensityBucket) -> Option<&CachedAsset> {
        self.versions.iter().rev().find(|v| v.bucket == bucket)
    }

    /// The cached instance for an exact (bucket, origin) pair.
    pub fn version_for(&self, bucket: DensityBucket, origin: Option<&Path>) -> Option<&CachedAsset> {
        self.versions
            .iter()
            .find(|v| v.bucket == bucket && v.origin.as_deref() == origin)
    }

    /// Every cached instance for this path.
    pub fn versions(&self) -> &[CachedAsset] {
        &self.versions
    }

    fn upsert(&mut self, asset: CachedAsset) {
        match self
            .versions
            .iter_mut()
            .find(|v| v.bucket == asset.bucket && v.origin == asset.origin)
        {
            Some(slot) => *slot = asset,
            None => self.versions.push(asset),
        }
    }

    fn remove(&mut self, bucket: DensityBucket, origin: Option<&Path>) {
        self.versions
            .retain(|v| !(v.bucket == bucket && v.origin.as_deref() == origin));
    }
}

/// The cache table: logical path → versions, plus the flag table.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: AHashMap<AssetPath, CacheEntry>,
    flags: AHashMap<AssetPath, AssetFlags>,
}

impl AssetCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) lookup of the entry for an exact pre-normalized path.
    pub fn try_get(&self, path: &AssetPath) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Inserts or replaces the (bucket, origin) slot for `path`.
    pub fn update(&mut self, path: &AssetPath, metadata: &SourceMetadata, value: LoadedValue) {
        self.restore(
            path,
            CachedAsset {
                value,
                bucket: metadata.bucket,
                origin: metadata.override_origin.clone(),
            },
        );
    }

    /// Puts a previously obtained instance back into its slot. Used by the
    /// reload protocol to reinstate a last-known-good value after a
    /// rejected revalidation.
    pub fn restore(&mut self, path: &AssetPath, asset: CachedAsset) {
        self.entries.entry(path.clone()).or_default().upsert(asset);
    }

    /// Drops one (bucket, origin) slot; the entry disappears with its last
    /// slot.
    pub fn remove_version(&mut self, path: &AssetPath, bucket: DensityBucket, origin: Option<&Path>) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.remove(bucket, origin);
            if entry.versions.is_empty() {
                self.entries.remove(path);
            }
        }
    }

    /// Sets the opaque flag word for `path`. Independent of whether any
    /// instance is cached.
    pub fn set_flags(&mut self, path: &AssetPath, flags: AssetFlags) {
        self.flags.insert(path.clone(), flags);
    }

    /// The opaque flag word for `path`, if one was ever set.
    pub fn flags(&self, path: &AssetPath) -> Option<AssetFlags> {
        self.flags.get(path).copied()
    }

    /// Bulk eviction, wired to the host's low-memory signal.
    ///
    /// `all = true` clears every instance and every flag. `all = false`
    /// evicts every instance except those whose path carries
    /// [`AssetFlags::PINNED`]; the flag table itself is left alone.
    pub fn purge(&mut self, all: bool) {
        if all {
            let dropped = self.entries.len();
            self.entries.clear();
            self.flags.clear();
            log::debug!("Purged all {dropped} cached paths");
            return;
        }
        let flags = &self.flags;
        let before = self.entries.len();
        self.entries
            .retain(|path, _| flags.get(path).is_some_and(|f| f.contains(AssetFlags::PINNED)));
        log::debug!("Purged {} of {before} cached paths", before - self.entries.len());
    }

    /// Drops cached variants for every bucket other than `active`. Wired
    /// to the host's display-density-changed signal.
    pub fn purge_unused_densities(&mut self, active: DensityBucket) {
        self.entries.retain(|_, entry| {
            entry.versions.retain(|v| v.bucket == active);
            !entry.versions.is_empty()
        });
    }

    /// Number of paths with at least one cached instance.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no instances are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
