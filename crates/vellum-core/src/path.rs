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

//! Normalized logical asset paths.
//!
//! Every asset in the runtime is addressed by an [`AssetPath`]: a
//! slash-delimited path relative to a content root. Construction is the only
//! place normalization happens; once built, the string form is canonical and
//! can be used directly as a cache key. Normalization is idempotent and
//! total: every accepted input has exactly one normalized form.

use std::fmt;

/// An error produced while normalizing a logical asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path was empty, or normalized to nothing (e.g. `"./."`).
    Empty,
    /// The path was absolute (leading separator or drive prefix).
    /// Logical paths are always relative to a content root.
    Absolute(String),
    /// A `..` segment escaped above the content root.
    TraversalAboveRoot(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "Asset path is empty"),
            PathError::Absolute(p) => {
                write!(f, "Asset path '{p}' is absolute; logical paths must be relative")
            }
            PathError::TraversalAboveRoot(p) => {
                write!(f, "Asset path '{p}' traverses above the content root")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A normalized, slash-delimited path identifying an asset below a content
/// root.
///
/// `AssetPath` is the identity used by the cache and the dependency graph.
/// Two `AssetPath`s compare equal exactly when their normalized string forms
/// are byte-equal; callers that construct paths from different spellings of
/// the same file get the same `AssetPath` back, because [`AssetPath::new`]
/// resolves `.`/`..` segments, collapses duplicate separators, and converts
/// backslashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    /// Normalizes `raw` into a canonical logical path.
    ///
    /// # Errors
    /// - [`PathError::Absolute`] for a leading `/` or a drive prefix.
    /// - [`PathError::TraversalAboveRoot`] when a `..` segment would escape
    ///   the root.
    /// - [`PathError::Empty`] when nothing remains after normalization.
    pub fn new(raw: &str) -> Result<Self, PathError> {
        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(PathError::Absolute(raw.to_string()));
        }
        if unified.as_bytes().get(1) == Some(&b':') {
            return Err(PathError::Absolute(raw.to_string()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::TraversalAboveRoot(raw.to_string()));
                    }
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(segments.join("/")))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final segment (file name including any extension).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The final segment without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// The extension carried by the final segment, without the dot.
    ///
    /// A logical path may legitimately carry no extension; the resolver then
    /// infers one from whichever physical form it finds.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// The directory portion, or `None` for a top-level path.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(dir, _)| dir)
    }

    /// Returns a copy of this path with the final segment's extension
    /// removed. Paths without an extension are returned unchanged.
    pub fn without_extension(&self) -> AssetPath {
        match self.extension() {
            Some(ext) => AssetPath(self.0[..self.0.len() - ext.len() - 1].to_string()),
            None => self.clone(),
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
