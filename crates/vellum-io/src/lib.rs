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

//! # Vellum IO
//!
//! I/O services for the content runtime: resolving logical asset paths to
//! physical files across layered search roots, reading wrapper metadata
//! sidecars, framing the precompiled binary container, and surfacing
//! filesystem change notifications for hot reload.

#![warn(missing_docs)]

pub mod compiled;
pub mod ext;
pub mod resolver;
pub mod sidecar;
pub mod watcher;

pub use compiled::{CompiledError, CompiledHeader};
pub use resolver::{
    DensityResolver, Resolved, ResolvedForm, ResolvedSource, ResolveError, ResolveFlags,
    SearchRoots,
};
pub use sidecar::{WrapperDoc, WrapperError, WrapperKind};
pub use watcher::{FileWatchService, WatchError, WatchEvent};
