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

//! Watcher registration and the lazy filesystem subscription.
//!
//! The watch manager keeps the per-path watcher lists (in registration
//! order), memoizes [`SharedWatched`] wrappers per (path, bucket), and owns
//! the [`FileWatchService`] subscription. The subscription is created
//! lazily, rooted at the content roots, on the first registration; every
//! later registration reuses it. Change events are never acted on here —
//! the service's channel is drained by the content manager on its owning
//! thread.

use ahash::AHashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use vellum_core::{AssetPath, ContentWatcher, DensityBucket, LoadedValue};
use vellum_io::{FileWatchService, SearchRoots, WatchError};

use crate::watched::SharedWatched;

struct WatcherEntry {
    bucket: DensityBucket,
    watcher: Arc<dyn ContentWatcher>,
}

#[derive(Default)]
struct WatchTables {
    watchers: AHashMap<AssetPath, Vec<WatcherEntry>>,
    shared: AHashMap<(AssetPath, DensityBucket), Arc<SharedWatched>>,
}

/// Per-manager watcher bookkeeping plus the lazy OS subscription.
#[derive(Default)]
pub struct WatchManager {
    tables: Mutex<WatchTables>,
    service: Mutex<Option<FileWatchService>>,
}

impl WatchManager {
    /// An empty watch manager with no active subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `watcher` for reloads of (`path`, `bucket`). Watchers are
    /// consulted in registration order during the validation handshake.
    pub fn add_watcher(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
        watcher: Arc<dyn ContentWatcher>,
    ) {
        let mut tables = self.tables.lock().expect("watch tables poisoned");
        tables
            .watchers
            .entry(path.clone())
            .or_default()
            .push(WatcherEntry { bucket, watcher });
    }

    /// Unregisters a watcher by identity. Removing the last watcher for a
    /// path does not tear down the filesystem subscription; that only
    /// happens on manager disposal.
    pub fn remove_watcher(&self, path: &AssetPath, watcher: &Arc<dyn ContentWatcher>) {
        let mut tables = self.tables.lock().expect("watch tables poisoned");
        if let Some(entries) = tables.watchers.get_mut(path) {
            entries.retain(|e| !Arc::ptr_eq(&e.watcher, watcher));
            if entries.is_empty() {
                tables.watchers.remove(path);
            }
        }
    }

    /// The watchers registered for (`path`, `bucket`), in registration
    /// order.
    pub fn watchers_for(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
    ) -> Vec<Arc<dyn ContentWatcher>> {
        let tables = self.tables.lock().expect("watch tables poisoned");
        tables
            .watchers
            .get(path)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.bucket == bucket)
                    .map(|e| e.watcher.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any watcher (any bucket) is registered for `path`.
    pub fn has_watchers(&self, path: &AssetPath) -> bool {
        let tables = self.tables.lock().expect("watch tables poisoned");
        tables.watchers.get(path).is_some_and(|e| !e.is_empty())
    }

    /// The memoized shared wrapper for (`path`, `bucket`), if one exists.
    pub fn existing_shared(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
    ) -> Option<Arc<SharedWatched>> {
        let tables = self.tables.lock().expect("watch tables poisoned");
        tables.shared.get(&(path.clone(), bucket)).cloned()
    }

    /// Returns the shared wrapper for (`path`, `bucket`), creating and
    /// registering it (as its own watcher) on first use. `value` seeds a
    /// newly created wrapper and is ignored when one already exists.
    pub fn shared(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
        value: LoadedValue,
    ) -> Arc<SharedWatched> {
        let created = {
            let mut tables = self.tables.lock().expect("watch tables poisoned");
            if let Some(existing) = tables.shared.get(&(path.clone(), bucket)) {
                return existing.clone();
            }
            let wrapper = Arc::new(SharedWatched::new(path.clone(), bucket, value));
            tables.shared.insert((path.clone(), bucket), wrapper.clone());
            wrapper
        };
        self.add_watcher(path, bucket, created.clone());
        created
    }

    /// Lazily creates the filesystem subscription rooted at the content
    /// roots. Returns whether watching is active afterwards; `false` means
    /// the platform (or the environment toggle) has it disabled, which is
    /// not an error — reloads then only happen via explicit invalidation.
    pub fn ensure_watching(&self, roots: &SearchRoots) -> bool {
        let mut service = self.service.lock().expect("watch service poisoned");
        if service.is_none() {
            match FileWatchService::new() {
                Ok(created) => *service = Some(created),
                Err(WatchError::Unsupported) => {
                    log::debug!("Filesystem watching unavailable; reloads are manual");
                    return false;
                }
                Err(e) => {
                    log::warn!("Failed to start filesystem watching: {e}");
                    return false;
                }
            }
        }
        let active = service.as_mut().expect("service just ensured");
        for root in roots.all() {
            if let Err(e) = active.watch_root(root) {
                log::warn!("Failed to watch content root {}: {e}", root.display());
            }
        }
        true
    }

    /// Drains every change event queued by the OS callback thread.
    /// Intended to be called from the owning runtime's single-writer
    /// thread only.
    pub fn drain_events(&self) -> Vec<PathBuf> {
        let service = self.service.lock().expect("watch service poisoned");
        let Some(service) = service.as_ref() else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        while let Ok(event) = service.receiver().try_recv() {
            paths.push(event.path);
        }
        paths
    }

    /// Tears down the subscription, releasing the underlying OS watch
    /// handles.
    pub fn shutdown(&self) {
        let mut service = self.service.lock().expect("watch service poisoned");
        if service.take().is_some() {
            log::debug!("Filesystem watch subscription released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingWatcher;

    impl ContentWatcher for CountingWatcher {
        fn validation_complete(&self, _: &AssetPath, _: Option<&LoadedValue>, _: bool) {}
    }

    #[test]
    fn watchers_filter_by_bucket_and_keep_order() {
        let manager = WatchManager::new();
        let path = AssetPath::new("theme").unwrap();
        let a: Arc<dyn ContentWatcher> = Arc::new(CountingWatcher);
        let b: Arc<dyn ContentWatcher> = Arc::new(CountingWatcher);
        let c: Arc<dyn ContentWatcher> = Arc::new(CountingWatcher);

        manager.add_watcher(&path, DensityBucket::High, a.clone());
        manager.add_watcher(&path, DensityBucket::Low, b.clone());
        manager.add_watcher(&path, DensityBucket::High, c.clone());

        let high = manager.watchers_for(&path, DensityBucket::High);
        assert_eq!(high.len(), 2);
        assert!(Arc::ptr_eq(&high[0], &a));
        assert!(Arc::ptr_eq(&high[1], &c));
        assert!(manager.has_watchers(&path));
    }

    #[test]
    fn remove_watcher_by_identity() {
        let manager = WatchManager::new();
        let path = AssetPath::new("theme").unwrap();
        let a: Arc<dyn ContentWatcher> = Arc::new(CountingWatcher);
        manager.add_watcher(&path, DensityBucket::High, a.clone());
        manager.remove_watcher(&path, &a);
        assert!(!manager.has_watchers(&path));
    }

    #[test]
    fn shared_wrappers_are_memoized() {
        let manager = WatchManager::new();
        let path = AssetPath::new("theme").unwrap();
        let first = manager.shared(&path, DensityBucket::High, LoadedValue::new(1u32));
        let second = manager.shared(&path, DensityBucket::High, LoadedValue::new(2u32));
        assert!(Arc::ptr_eq(&first, &second));
        // The seed of the second call was ignored.
        assert_eq!(*second.current().unwrap().downcast_arc::<u32>().unwrap(), 1);
        // Distinct buckets get distinct wrappers.
        let low = manager.shared(&path, DensityBucket::Low, LoadedValue::new(3u32));
        assert!(!Arc::ptr_eq(&first, &low));
    }
}
