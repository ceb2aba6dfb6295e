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

//! The content manager: load orchestration, caching, and the reload
//! protocol.
//!
//! A load walks `CacheCheck → Resolve → Import → Process → CacheStore →
//! Validate → Done`; a cache hit for the exact (path, bucket) pair
//! short-circuits to `Done` with the cached instance. Cache table,
//! dependency graph, and primary-file index are guarded by one mutex per
//! manager instance, held only around table access — never across
//! resolution or conversion, which may block on file I/O.
//!
//! Filesystem change events are drained by [`ContentManager::process_changes`],
//! which the owning runtime must call from its designated single-writer
//! thread. Watcher callbacks run outside the state lock and must not
//! re-enter the manager.

use ahash::{AHashMap, AHashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vellum_core::{
    AssetPath, ContentWatcher, ConvertError, DensityBucket, Intermediate, LoadedValue,
    SourceMetadata,
};
use vellum_io::{compiled, DensityResolver, ResolveFlags, SearchRoots};

use crate::cache::{AssetCache, AssetFlags, CachedAsset};
use crate::dependency::DependencyGraph;
use crate::error::ContentError;
use crate::registry::ConverterRegistry;
use crate::watch_manager::WatchManager;
use crate::watched::SharedWatched;

/// Environment variable supplying the process-wide default for dependency
/// tracking. Read once in [`ContentConfig::new`], never consulted again.
pub const TRACK_DEPENDENCIES_ENV: &str = "VELLUM_TRACK_DEPENDENCIES";

/// Construction-time configuration for one [`ContentManager`].
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// The search roots resolution walks.
    pub roots: SearchRoots,
    /// Whether this instance records dependency declarations. Defaults
    /// from [`TRACK_DEPENDENCIES_ENV`] (on unless set to `0`/`false`).
    pub track_dependencies: bool,
    /// Resolution flags used by [`ContentManager::load`].
    pub default_flags: ResolveFlags,
}

impl ContentConfig {
    /// A configuration rooted at `base` with default flags and the
    /// process-wide dependency-tracking default.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            roots: SearchRoots::new(base),
            track_dependencies: default_dependency_tracking(),
            default_flags: ResolveFlags::DEFAULT,
        }
    }

    /// Appends an override directory (later registrations win).
    pub fn with_override(mut self, dir: impl Into<PathBuf>) -> Self {
        self.roots = self.roots.with_override(dir);
        self
    }

    /// Appends a fallback (developer-tree) root.
    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.roots = self.roots.with_fallback(dir);
        self
    }

    /// Replaces the default resolution flags.
    pub fn with_default_flags(mut self, flags: ResolveFlags) -> Self {
        self.default_flags = flags;
        self
    }

    /// Forces dependency tracking on or off for this instance.
    pub fn track_dependencies(mut self, on: bool) -> Self {
        self.track_dependencies = on;
        self
    }
}

fn default_dependency_tracking() -> bool {
    match std::env::var(TRACK_DEPENDENCIES_ENV) {
        Ok(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
        Err(_) => true,
    }
}

struct ManagerState {
    cache: AssetCache,
    deps: DependencyGraph,
    /// Resolved primary file → the logical asset it belongs to. Lets a
    /// filesystem event map back to the asset whose file it is.
    primary: AHashMap<PathBuf, (AssetPath, DensityBucket)>,
}

struct PipelineOutput {
    value: LoadedValue,
    metadata: SourceMetadata,
}

/// Orchestrates resolution, conversion, caching, and reloads for one
/// content tree.
pub struct ContentManager {
    resolver: DensityResolver,
    registry: ConverterRegistry,
    state: Mutex<ManagerState>,
    watch: WatchManager,
    track_dependencies: bool,
    default_flags: ResolveFlags,
}

impl ContentManager {
    /// A manager with the built-in converters installed.
    pub fn new(config: ContentConfig) -> Self {
        Self::with_registry(config, ConverterRegistry::with_builtins())
    }

    /// A manager using a caller-assembled converter registry.
    pub fn with_registry(config: ContentConfig, registry: ConverterRegistry) -> Self {
        Self {
            resolver: DensityResolver::new(config.roots),
            registry,
            state: Mutex::new(ManagerState {
                cache: AssetCache::new(),
                deps: DependencyGraph::new(),
                primary: AHashMap::new(),
            }),
            watch: WatchManager::new(),
            track_dependencies: config.track_dependencies,
            default_flags: config.default_flags,
        }
    }

    /// Mutable access to the converter registry, for installing importers
    /// and processors before the manager is shared.
    pub fn registry_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.registry
    }

    /// The resolver, exposed for direct resolution queries.
    pub fn resolver(&self) -> &DensityResolver {
        &self.resolver
    }

    // --- Loading ------------------------------------------------------

    /// Loads `path` for `bucket`, returning the cached instance when one
    /// exists for that exact pair. A hit for a different bucket on the
    /// same path is a miss for this one.
    pub fn load(&self, path: &AssetPath, bucket: DensityBucket) -> Result<LoadedValue, ContentError> {
        self.load_with(path, None, bucket, self.default_flags)
    }

    /// [`load`](Self::load) with an explicit extension and per-call flags.
    pub fn load_with(
        &self,
        path: &AssetPath,
        explicit_ext: Option<&str>,
        bucket: DensityBucket,
        flags: ResolveFlags,
    ) -> Result<LoadedValue, ContentError> {
        if let Some(hit) = self.cached(path, bucket) {
            return Ok(hit);
        }
        let output = self.run_pipeline(path, explicit_ext, bucket, flags, None)?;
        Ok(self.commit(path, output, None))
    }

    /// Typed load: resolves the processor by the exact
    /// `(importer output, T)` pair and hands back an `Arc<T>`.
    pub fn load_as<T: Send + Sync + 'static>(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
    ) -> Result<Arc<T>, ContentError> {
        let expected = std::any::type_name::<T>();
        let value = match self.cached(path, bucket) {
            Some(hit) => hit,
            None => {
                let output =
                    self.run_pipeline(path, None, bucket, self.default_flags, Some(expected))?;
                self.commit(path, output, None)
            }
        };
        value
            .downcast_arc::<T>()
            .ok_or_else(|| ContentError::WrongType {
                path: path.clone(),
                expected,
                actual: value.type_name(),
            })
    }

    /// Whether an instance is cached for the exact (path, bucket) pair.
    pub fn is_cached(&self, path: &AssetPath, bucket: DensityBucket) -> bool {
        self.cached(path, bucket).is_some()
    }

    // --- Individual pipeline stages ----------------------------------

    /// Resolves and imports `path` without processing or caching. The
    /// precompiled candidate is excluded: import always works on source
    /// forms.
    pub fn import(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
    ) -> Result<(Intermediate, SourceMetadata), ContentError> {
        let flags = self.default_flags.difference(ResolveFlags::PRECOMPILED);
        let source = self.resolver.resolve_source(path, None, bucket, flags)?;
        let mut metadata = source.metadata;
        let bytes = read_source(&metadata.physical_path)?;
        let importer = self
            .registry
            .importer_for(&metadata.extension)
            .map_err(|e| convert_error(path, e))?;
        let intermediate = importer
            .import(&bytes, &mut metadata)
            .map_err(|e| convert_error(path, e))?;
        Ok((intermediate, metadata))
    }

    /// Processes an imported intermediate with the default processor for
    /// its type. Does not touch the cache.
    pub fn process(
        &self,
        intermediate: Intermediate,
        metadata: &mut SourceMetadata,
    ) -> Result<LoadedValue, ContentError> {
        let path = metadata.logical_path.clone();
        let processor = self
            .registry
            .default_processor(intermediate.type_name())
            .map_err(|e| convert_error(&path, e))?;
        processor
            .process(intermediate, metadata)
            .map_err(|e| convert_error(&path, e))
    }

    /// Runs import and process for `path`, then writes the result as a
    /// precompiled container under `out_dir`, mirroring the logical path.
    /// Returns the container's path.
    pub fn preprocess(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
        out_dir: &Path,
    ) -> Result<PathBuf, ContentError> {
        let (intermediate, mut metadata) = self.import(path, bucket)?;
        let processor = self
            .registry
            .default_processor(intermediate.type_name())
            .map_err(|e| convert_error(path, e))?
            .clone();
        let value = processor
            .process(intermediate, &mut metadata)
            .map_err(|e| convert_error(path, e))?;
        let payload = processor
            .write_precompiled(&value)
            .map_err(|e| convert_error(path, e))?;
        let container = compiled::write_container(processor.name(), &payload);

        let out_path = out_dir.join(format!(
            "{}.{}",
            path.without_extension().as_str(),
            vellum_io::ext::PRECOMPILED
        ));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ContentError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&out_path, container).map_err(|source| ContentError::Io {
            path: out_path.clone(),
            source,
        })?;
        log::debug!("Preprocessed '{path}' into {}", out_path.display());
        Ok(out_path)
    }

    // --- Watching and reload -----------------------------------------

    /// Registers a reload watcher for (`path`, `bucket`) and lazily starts
    /// the filesystem subscription over the content roots.
    pub fn add_watcher(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
        watcher: Arc<dyn ContentWatcher>,
    ) {
        self.watch.add_watcher(path, bucket, watcher);
        self.watch.ensure_watching(self.resolver.roots());
    }

    /// Unregisters a watcher by identity.
    pub fn remove_watcher(&self, path: &AssetPath, watcher: &Arc<dyn ContentWatcher>) {
        self.watch.remove_watcher(path, watcher);
    }

    /// The shared watched wrapper for (`path`, `bucket`): loads the value
    /// on first use, then hands every caller the same memoized instance.
    pub fn shared_watched(
        &self,
        path: &AssetPath,
        bucket: DensityBucket,
    ) -> Result<Arc<SharedWatched>, ContentError> {
        if let Some(existing) = self.watch.existing_shared(path, bucket) {
            return Ok(existing);
        }
        let value = self.load(path, bucket)?;
        let wrapper = self.watch.shared(path, bucket, value);
        self.watch.ensure_watching(self.resolver.roots());
        Ok(wrapper)
    }

    /// Drains queued filesystem events and runs the resulting reloads and
    /// cascades. Must be called from the owning runtime's single-writer
    /// thread. Returns the number of reload attempts performed.
    pub fn process_changes(&self) -> usize {
        let mut visited = AHashSet::new();
        let mut count = 0;
        for file in self.watch.drain_events() {
            count += self.invalidate_file(&file, &mut visited);
        }
        count
    }

    /// Applies the invalidation protocol for one changed physical file, as
    /// if the watch service had reported it. Must be called from the
    /// owning runtime's single-writer thread.
    pub fn notify_file_changed(&self, file: &Path) -> usize {
        let mut visited = AHashSet::new();
        self.invalidate_file(file, &mut visited)
    }

    // --- Cache administration ----------------------------------------

    /// Bulk eviction, wired to the host's low-memory signal. `all = false`
    /// keeps paths flagged [`AssetFlags::PINNED`]; `all = true` also drops
    /// flags, dependency records, and the primary-file index.
    pub fn purge(&self, all: bool) {
        let mut state = self.state.lock().expect("content state poisoned");
        state.cache.purge(all);
        if all {
            state.deps = DependencyGraph::new();
            state.primary.clear();
        }
    }

    /// Drops cached variants for buckets other than the active display's,
    /// wired to the host's density-changed signal.
    pub fn purge_unused_densities(&self, active: DensityBucket) {
        let mut state = self.state.lock().expect("content state poisoned");
        state.cache.purge_unused_densities(active);
    }

    /// Sets the opaque flag word for `path`.
    pub fn set_flags(&self, path: &AssetPath, flags: AssetFlags) {
        let mut state = self.state.lock().expect("content state poisoned");
        state.cache.set_flags(path, flags);
    }

    /// The opaque flag word for `path`, if any.
    pub fn flags(&self, path: &AssetPath) -> Option<AssetFlags> {
        let state = self.state.lock().expect("content state poisoned");
        state.cache.flags(path)
    }

    // --- Internals ----------------------------------------------------

    fn cached(&self, path: &AssetPath, bucket: DensityBucket) -> Option<LoadedValue> {
        let state = self.state.lock().expect("content state poisoned");
        state
            .cache
            .try_get(path)
            .and_then(|entry| entry.version(bucket))
            .map(|cached| cached.value.clone())
    }

    fn run_pipeline(
        &self,
        path: &AssetPath,
        explicit_ext: Option<&str>,
        bucket: DensityBucket,
        flags: ResolveFlags,
        desired_output: Option<&'static str>,
    ) -> Result<PipelineOutput, ContentError> {
        let source = self.resolver.resolve_source(path, explicit_ext, bucket, flags)?;
        let mut metadata = source.metadata;
        // Opened, fully consumed, and closed here; file handles are never
        // cached across calls.
        let bytes = read_source(&metadata.physical_path)?;

        let value = if source.precompiled {
            let (header, payload) =
                compiled::split(&bytes).map_err(|source| ContentError::Compiled {
                    path: metadata.physical_path.clone(),
                    source,
                })?;
            let processor = self
                .registry
                .processor_named(&header.processor)
                .map_err(|e| convert_error(path, e))?;
            let value = processor
                .read_precompiled(payload)
                .map_err(|e| convert_error(path, e))?;
            if let Some(expected) = desired_output {
                if value.type_name() != expected {
                    return Err(ContentError::WrongType {
                        path: path.clone(),
                        expected,
                        actual: value.type_name(),
                    });
                }
            }
            value
        } else {
            let importer = self
                .registry
                .importer_for(&metadata.extension)
                .map_err(|e| convert_error(path, e))?;
            let intermediate = importer
                .import(&bytes, &mut metadata)
                .map_err(|e| convert_error(path, e))?;
            let processor = match desired_output {
                Some(output) => self.registry.processor_for(intermediate.type_name(), output),
                None => self.registry.default_processor(intermediate.type_name()),
            }
            .map_err(|e| convert_error(path, e))?;
            processor
                .process(intermediate, &mut metadata)
                .map_err(|e| convert_error(path, e))?
        };

        Ok(PipelineOutput { value, metadata })
    }

    /// Stores a pipeline result and runs the validation handshake when
    /// watchers exist. `prior` is the last-known-good instance a rejected
    /// reload must reinstate. Returns the instance left in effect.
    fn commit(
        &self,
        path: &AssetPath,
        output: PipelineOutput,
        prior: Option<CachedAsset>,
    ) -> LoadedValue {
        let PipelineOutput { value, metadata } = output;
        {
            let mut state = self.state.lock().expect("content state poisoned");
            state.cache.update(path, &metadata, value.clone());
            state
                .primary
                .insert(metadata.physical_path.clone(), (path.clone(), metadata.bucket));
        }

        let watchers = self.watch.watchers_for(path, metadata.bucket);
        if watchers.is_empty() {
            self.rebuild_dependencies(path, &metadata);
            return value;
        }

        let mut consulted = 0;
        let mut accepted = true;
        for watcher in &watchers {
            consulted += 1;
            if !watcher.validating(path, &value) {
                accepted = false;
                break;
            }
        }

        if accepted {
            // Dependency rebuild happens only for accepted loads.
            self.rebuild_dependencies(path, &metadata);
            for watcher in &watchers {
                watcher.validation_complete(path, Some(&value), true);
            }
            return value;
        }

        // First rejection wins: discard the candidate (dropping the last
        // handle disposes it), reinstate the prior instance, and notify
        // everyone consulted so far. The dependency graph keeps its
        // pre-reload records.
        {
            let mut state = self.state.lock().expect("content state poisoned");
            state
                .cache
                .remove_version(path, metadata.bucket, metadata.override_origin.as_deref());
            if let Some(prior) = prior.clone() {
                state.cache.restore(path, prior);
            }
        }
        for watcher in watchers.iter().take(consulted) {
            watcher.validation_complete(path, None, false);
        }
        log::info!("Reload of '{path}' rejected; last-known-good value kept");
        match prior {
            Some(prior) => prior.value,
            None => value,
        }
    }

    fn rebuild_dependencies(&self, path: &AssetPath, metadata: &SourceMetadata) {
        if !self.track_dependencies {
            return;
        }
        let mut state = self.state.lock().expect("content state poisoned");
        state.deps.set_dependencies(path, metadata.dependencies());
    }

    /// Reloads one cached (path, bucket) pair. Conversion failures here
    /// are swallowed — the last-known-good value stays cached and watchers
    /// observe `validated = false` — unlike initial loads, which propagate
    /// errors to the caller.
    fn reload_path(&self, path: &AssetPath, bucket: DensityBucket) {
        let prior = {
            let state = self.state.lock().expect("content state poisoned");
            state
                .cache
                .try_get(path)
                .and_then(|entry| entry.version(bucket))
                .cloned()
        };
        // Only cached assets reload; anything else waits for a real load.
        let Some(prior) = prior else {
            return;
        };

        match self.run_pipeline(path, None, bucket, self.default_flags, None) {
            Ok(output) => {
                self.commit(path, output, Some(prior));
            }
            Err(e) => {
                log::warn!("Reload of '{path}' failed, keeping last-known-good: {e}");
                for watcher in self.watch.watchers_for(path, bucket) {
                    watcher.validation_complete(path, None, false);
                }
            }
        }
    }

    fn invalidate_file(&self, file: &Path, visited: &mut AHashSet<PathBuf>) -> usize {
        // Visited-set guard: dependency cycles must settle instead of
        // recursing unboundedly on a single change event.
        if !visited.insert(file.to_path_buf()) {
            return 0;
        }
        let mut reloaded = 0;

        let primary = {
            let state = self.state.lock().expect("content state poisoned");
            state.primary.get(file).cloned()
        };
        if let Some((path, bucket)) = primary {
            self.reload_path(&path, bucket);
            reloaded += 1;
        }

        let dependents = {
            let state = self.state.lock().expect("content state poisoned");
            state.deps.dependents_of_file(file)
        };
        for (owner, bucket) in dependents {
            self.reload_path(&owner, bucket);
            reloaded += 1;
            // The dependent's own primary file is recomputed and the
            // invalidation applied recursively.
            match self.resolver.resolve(&owner, None, bucket, self.default_flags) {
                Ok(resolved) => reloaded += self.invalidate_file(&resolved.physical_path, visited),
                Err(e) => {
                    log::warn!("Could not recompute primary file for dependent '{owner}': {e}")
                }
            }
        }
        reloaded
    }
}

impl Drop for ContentManager {
    fn drop(&mut self) {
        // Hold the state lock while the watch subscription is torn down so
        // the OS handles are released before the cache lock is.
        if let Ok(mut state) = self.state.lock() {
            self.watch.shutdown();
            state.cache.purge(true);
            state.deps = DependencyGraph::new();
            state.primary.clear();
        } else {
            self.watch.shutdown();
        }
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, ContentError> {
    fs::read(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn convert_error(path: &AssetPath, source: ConvertError) -> ContentError {
    ContentError::Convert {
        path: path.clone(),
        source,
    }
}
