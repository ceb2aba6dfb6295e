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

//! # Vellum Content
//!
//! The orchestration layer of the content runtime. The [`ContentManager`]
//! resolves logical paths through `vellum-io`, drives the import/process
//! pipeline, owns the multi-version asset cache and dependency graph, and
//! mediates the watched-reload protocol. An [`AsyncLoader`] runs the same
//! synchronous pipeline off the calling thread for callers that cannot
//! block.

#![warn(missing_docs)]

pub mod async_loader;
pub mod builtin;
pub mod cache;
pub mod dependency;
pub mod error;
pub mod manager;
pub mod registry;
pub mod watch_manager;
pub mod watched;

pub use async_loader::{AsyncLoader, CancellationToken, LoadSequence, SequenceOutcome};
pub use cache::{AssetCache, AssetFlags, CachedAsset, CacheEntry};
pub use dependency::DependencyGraph;
pub use error::ContentError;
pub use manager::{ContentConfig, ContentManager};
pub use registry::{ConverterRegistry, ImporterRegistration, ProcessorRegistration};
pub use watch_manager::WatchManager;
pub use watched::SharedWatched;
