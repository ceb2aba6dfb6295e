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

//! # Vellum Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the content runtime's architecture.
//!
//! Nothing in this crate touches the filesystem. It is the "common language"
//! spoken by the resolver, the converters, and the content manager living in
//! the higher-level crates.

#![warn(missing_docs)]

pub mod convert;
pub mod density;
pub mod metadata;
pub mod path;
pub mod watcher;

pub use convert::{ContentImporter, ContentProcessor, ConvertError, Intermediate, LoadedValue};
pub use density::DensityBucket;
pub use metadata::{SourceKind, SourceMetadata};
pub use path::{AssetPath, PathError};
pub use watcher::ContentWatcher;
