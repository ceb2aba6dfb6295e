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

//! Density-aware resolution of logical paths to physical files.
//!
//! Resolution searches a prioritized list of roots: an ordered set of
//! fallback (developer-tree) roots when requested, then the base content
//! root, then each override directory in ascending registration order with
//! the *last* match winning. Within one root the resolver prefers a
//! density-suffixed variant (`{name}-{bucket}{ext}`), walking the bucket
//! chain from the requested tier downward, and prefers forms in the order
//! precompiled container, wrapper metadata, raw file.

use std::fs;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vellum_core::{AssetPath, DensityBucket, SourceMetadata};

use crate::ext;
use crate::sidecar::{WrapperDoc, WrapperError, WrapperKind};

/// Independent switches controlling one resolution.
///
/// Combine with `|`: `ResolveFlags::PRECOMPILED | ResolveFlags::FALLBACK_ROOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveFlags {
    bits: u8,
}

impl ResolveFlags {
    /// No optional behavior: raw and wrapper forms only, exact names only.
    pub const NONE: Self = Self { bits: 0 };
    /// Consider a precompiled `.uvc` container as a candidate form.
    pub const PRECOMPILED: Self = Self { bits: 1 << 0 };
    /// Try density-suffixed filenames for extensionless requests.
    pub const DENSITY_VARIANTS: Self = Self { bits: 1 << 1 };
    /// Search the configured fallback roots before the packaged roots,
    /// retrying without the preference when they yield nothing.
    pub const FALLBACK_ROOTS: Self = Self { bits: 1 << 2 };
    /// The standard loading behavior.
    pub const DEFAULT: Self = Self {
        bits: Self::PRECOMPILED.bits | Self::DENSITY_VARIANTS.bits,
    };

    /// Creates flags from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
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

    /// Removes every flag in `other` from `self`.
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }
}

impl BitOr for ResolveFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// The prioritized physical directories a resolver searches.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    /// The application's packaged content root. Lowest priority.
    pub base: PathBuf,
    /// Override directories in ascending registration order; a later
    /// directory's match wins over all earlier results.
    pub overrides: Vec<PathBuf>,
    /// Developer-tree roots consulted before the packaged content when
    /// [`ResolveFlags::FALLBACK_ROOTS`] is set, first match winning.
    pub fallbacks: Vec<PathBuf>,
}

impl SearchRoots {
    /// Roots consisting of just a base directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overrides: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Appends an override directory (highest priority so far).
    pub fn with_override(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overrides.push(dir.into());
        self
    }

    /// Appends a fallback (developer-tree) root.
    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallbacks.push(dir.into());
        self
    }

    /// Every directory that can contribute files, for watch subscription.
    pub fn all(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.base.as_path())
            .chain(self.overrides.iter().map(PathBuf::as_path))
            .chain(self.fallbacks.iter().map(PathBuf::as_path))
    }
}

/// Which physical form a resolution settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedForm {
    /// A precompiled `.uvc` container.
    Precompiled,
    /// A wrapper metadata sidecar; the wrapped file still has to be
    /// located.
    Wrapper(WrapperKind),
    /// A raw asset file dispatched to an importer by extension.
    Raw,
}

/// The outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The physical file that won.
    pub physical_path: PathBuf,
    /// The search root the file came from.
    pub root: PathBuf,
    /// The override directory that supplied the file, `None` for the base
    /// or a fallback root.
    pub override_origin: Option<PathBuf>,
    /// The form of the winning file.
    pub form: ResolvedForm,
    /// The density bucket of the matched variant; equals the requested
    /// bucket when the unsuffixed file won.
    pub bucket: DensityBucket,
    /// True when the file came from a fallback root.
    pub from_dev_tree: bool,
    /// Extension of the winning file, without the dot.
    pub extension: String,
}

/// A [`Resolved`] elaborated into import-ready metadata.
///
/// Wrapper sidecars are already chased here: the metadata points at the
/// wrapped file and carries the sidecar's side-channel blocks.
#[derive(Debug)]
pub struct ResolvedSource {
    /// Metadata for the file the converters will consume.
    pub metadata: SourceMetadata,
    /// True when the source is a precompiled container that bypasses
    /// import/process.
    pub precompiled: bool,
}

/// An error produced during resolution. Always fatal to the requesting
/// call; resolution is never retried automatically.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No search root contained a matching file.
    #[error("Asset '{path}' was not found in any search root")]
    NotFound {
        /// The logical path that failed to resolve.
        path: AssetPath,
    },
    /// More than one raw file matched after extension filtering.
    #[error("Asset '{path}' is ambiguous in '{directory}': {candidates:?}")]
    Ambiguous {
        /// The logical path being resolved.
        path: AssetPath,
        /// The directory holding the clashing candidates.
        directory: PathBuf,
        /// The clashing file names, sorted.
        candidates: Vec<String>,
    },
    /// A wrapper sidecar failed to parse or referenced a missing file.
    #[error("Wrapper '{path}' failed to resolve")]
    Wrapper {
        /// The wrapper file.
        path: PathBuf,
        /// The underlying wrapper error.
        #[source]
        source: WrapperError,
    },
    /// The filesystem failed underneath the resolver.
    #[error("I/O error while resolving in '{path}'")]
    Io {
        /// The directory or file being inspected.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

struct RootMatch {
    physical_path: PathBuf,
    form: ResolvedForm,
    bucket: DensityBucket,
    extension: String,
}

/// Resolves logical asset paths against a set of [`SearchRoots`].
#[derive(Debug, Clone)]
pub struct DensityResolver {
    roots: SearchRoots,
}

impl DensityResolver {
    /// Creates a resolver over the given roots.
    pub fn new(roots: SearchRoots) -> Self {
        Self { roots }
    }

    /// The roots this resolver searches.
    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Resolves `path` to a physical file.
    ///
    /// An extension carried by `path` or passed as `explicit_ext`
    /// constrains the search to exactly that form and disables density
    /// substitution; otherwise the extension is inferred from whichever
    /// form is found, preferring precompiled, then wrapper metadata, then
    /// raw.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] when nothing matches,
    /// [`ResolveError::Ambiguous`] when more than one raw candidate
    /// remains within a single root.
    pub fn resolve(
        &self,
        path: &AssetPath,
        explicit_ext: Option<&str>,
        bucket: DensityBucket,
        flags: ResolveFlags,
    ) -> Result<Resolved, ResolveError> {
        let (stem_path, constraint) = split_constraint(path, explicit_ext);
        let constraint = constraint.as_deref();
        let rel_dir = stem_path.parent().unwrap_or("");
        let stem = stem_path.file_name().to_string();

        // Developer-tree preference pass: first fallback root that matches
        // wins; an empty yield falls through to the packaged roots.
        if flags.contains(ResolveFlags::FALLBACK_ROOTS) {
            for root in &self.roots.fallbacks {
                if let Some(m) =
                    self.scan_root(root, rel_dir, &stem, constraint, bucket, flags, path)?
                {
                    log::trace!("Resolved '{path}' from fallback root {}", root.display());
                    return Ok(finish(m, root.clone(), None, true));
                }
            }
        }

        // Packaged pass: base first, then overrides ascending; a later
        // match replaces the running best (last-match-wins).
        let mut best: Option<(RootMatch, PathBuf, Option<PathBuf>)> = None;
        if let Some(m) =
            self.scan_root(&self.roots.base, rel_dir, &stem, constraint, bucket, flags, path)?
        {
            best = Some((m, self.roots.base.clone(), None));
        }
        for root in &self.roots.overrides {
            if let Some(m) =
                self.scan_root(root, rel_dir, &stem, constraint, bucket, flags, path)?
            {
                best = Some((m, root.clone(), Some(root.clone())));
            }
        }

        match best {
            Some((m, root, origin)) => {
                log::trace!(
                    "Resolved '{path}' to {} (override: {})",
                    m.physical_path.display(),
                    origin.is_some()
                );
                Ok(finish(m, root, origin, false))
            }
            None => Err(ResolveError::NotFound { path: path.clone() }),
        }
    }

    /// Resolves `path` and elaborates the result into import-ready
    /// [`SourceMetadata`], chasing wrapper sidecars.
    ///
    /// # Errors
    /// Everything [`resolve`](DensityResolver::resolve) can produce, plus
    /// [`ResolveError::Wrapper`] when a sidecar is malformed or references
    /// a file that does not exist.
    pub fn resolve_source(
        &self,
        path: &AssetPath,
        explicit_ext: Option<&str>,
        bucket: DensityBucket,
        flags: ResolveFlags,
    ) -> Result<ResolvedSource, ResolveError> {
        let resolved = self.resolve(path, explicit_ext, bucket, flags)?;

        let mut metadata = SourceMetadata::new(path.clone(), resolved.physical_path.clone(), bucket);
        metadata.override_origin = resolved.override_origin.clone();
        metadata.from_dev_tree = resolved.from_dev_tree;

        match resolved.form {
            ResolvedForm::Precompiled => Ok(ResolvedSource {
                metadata,
                precompiled: true,
            }),
            ResolvedForm::Raw => Ok(ResolvedSource {
                metadata,
                precompiled: false,
            }),
            ResolvedForm::Wrapper(kind) => {
                let wrapper_path = resolved.physical_path;
                let text = fs::read_to_string(&wrapper_path).map_err(|source| ResolveError::Io {
                    path: wrapper_path.clone(),
                    source,
                })?;
                let doc = WrapperDoc::parse(kind, &text).map_err(|source| ResolveError::Wrapper {
                    path: wrapper_path.clone(),
                    source,
                })?;
                let wrapper_dir = wrapper_path.parent().unwrap_or(Path::new(""));
                let wrapped =
                    doc.locate_source(wrapper_dir)
                        .map_err(|source| ResolveError::Wrapper {
                            path: wrapper_path.clone(),
                            source,
                        })?;

                let mut metadata = SourceMetadata::new(path.clone(), wrapped, bucket);
                metadata.override_origin = resolved.override_origin;
                metadata.from_dev_tree = resolved.from_dev_tree;
                metadata.importer_data = doc.importer;
                metadata.processor_data = doc.processor;
                // Editing the wrapper itself must reload the asset.
                metadata.add_dependency(wrapper_path);
                Ok(ResolvedSource {
                    metadata,
                    precompiled: false,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_root(
        &self,
        root: &Path,
        rel_dir: &str,
        stem: &str,
        constraint: Option<&str>,
        bucket: DensityBucket,
        flags: ResolveFlags,
        path: &AssetPath,
    ) -> Result<Option<RootMatch>, ResolveError> {
        let dir = if rel_dir.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rel_dir)
        };
        if !dir.is_dir() {
            return Ok(None);
        }

        // Bucket-suffixed variants apply only to extensionless requests,
        // tried from the requested bucket down, never above it.
        if constraint.is_none() && flags.contains(ResolveFlags::DENSITY_VARIANTS) {
            for variant_bucket in bucket.fallback_chain() {
                let variant = format!("{stem}-{}", variant_bucket.suffix());
                if let Some(m) =
                    match_stem(&dir, &variant, constraint, flags, path, variant_bucket)?
                {
                    return Ok(Some(m));
                }
            }
        }
        match_stem(&dir, stem, constraint, flags, path, bucket)
    }
}

/// Splits the request into the extensionless stem path and the extension
/// constraint, if any. An explicit extension takes precedence; an extension
/// already carried by the path becomes the constraint otherwise.
fn split_constraint(path: &AssetPath, explicit_ext: Option<&str>) -> (AssetPath, Option<String>) {
    if let Some(ext) = explicit_ext {
        let ext = ext.trim_start_matches('.');
        let stem = if path.extension() == Some(ext) {
            path.without_extension()
        } else {
            path.clone()
        };
        return (stem, Some(ext.to_string()));
    }
    match path.extension() {
        Some(ext) => (path.without_extension(), Some(ext.to_string())),
        None => (path.clone(), None),
    }
}

fn finish(m: RootMatch, root: PathBuf, origin: Option<PathBuf>, dev: bool) -> Resolved {
    Resolved {
        physical_path: m.physical_path,
        root,
        override_origin: origin,
        form: m.form,
        bucket: m.bucket,
        from_dev_tree: dev,
        extension: m.extension,
    }
}

fn classify_extension(ext: &str) -> ResolvedForm {
    if ext == ext::PRECOMPILED {
        ResolvedForm::Precompiled
    } else if let Some(kind) = WrapperKind::from_extension(ext) {
        ResolvedForm::Wrapper(kind)
    } else {
        ResolvedForm::Raw
    }
}

fn match_stem(
    dir: &Path,
    stem: &str,
    constraint: Option<&str>,
    flags: ResolveFlags,
    path: &AssetPath,
    bucket: DensityBucket,
) -> Result<Option<RootMatch>, ResolveError> {
    if let Some(ext) = constraint {
        // Exactly one name can match a full (stem, extension) pair, so an
        // explicit extension can never be ambiguous.
        let candidate = dir.join(format!("{stem}.{ext}"));
        if !candidate.is_file() {
            return Ok(None);
        }
        let form = classify_extension(ext);
        return Ok(Some(RootMatch {
            physical_path: candidate,
            form,
            bucket,
            extension: ext.to_string(),
        }));
    }

    // Form precedence: precompiled container, wrapper metadata, raw file.
    if flags.contains(ResolveFlags::PRECOMPILED) {
        let candidate = dir.join(format!("{stem}.{}", ext::PRECOMPILED));
        if candidate.is_file() {
            return Ok(Some(RootMatch {
                physical_path: candidate,
                form: ResolvedForm::Precompiled,
                bucket,
                extension: ext::PRECOMPILED.to_string(),
            }));
        }
    }
    for wrapper_ext in ext::WRAPPER_EXTENSIONS {
        let candidate = dir.join(format!("{stem}.{wrapper_ext}"));
        if candidate.is_file() {
            let kind = WrapperKind::from_extension(wrapper_ext).expect("reserved wrapper extension");
            return Ok(Some(RootMatch {
                physical_path: candidate,
                form: ResolvedForm::Wrapper(kind),
                bucket,
                extension: wrapper_ext.to_string(),
            }));
        }
    }

    let mut raw: Vec<String> = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| ResolveError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ResolveError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some((file_stem, file_ext)) = name.rsplit_once('.') else {
            continue;
        };
        if file_stem == stem && !file_ext.is_empty() && !ext::is_reserved(file_ext) {
            raw.push(name);
        }
    }

    match raw.len() {
        0 => Ok(None),
        1 => {
            let name = raw.remove(0);
            let extension = name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default();
            Ok(Some(RootMatch {
                physical_path: dir.join(name),
                form: ResolvedForm::Raw,
                bucket,
                extension,
            }))
        }
        _ => {
            raw.sort();
            Err(ResolveError::Ambiguous {
                path: path.clone(),
                directory: dir.to_path_buf(),
                candidates: raw,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let flags = ResolveFlags::PRECOMPILED | ResolveFlags::FALLBACK_ROOTS;
        assert!(flags.contains(ResolveFlags::PRECOMPILED));
        assert!(flags.contains(ResolveFlags::FALLBACK_ROOTS));
        assert!(!flags.contains(ResolveFlags::DENSITY_VARIANTS));
        assert!(ResolveFlags::DEFAULT.contains(ResolveFlags::PRECOMPILED));
        assert!(ResolveFlags::DEFAULT.contains(ResolveFlags::DENSITY_VARIANTS));
    }

    #[test]
    fn constraint_splitting() {
        let path = AssetPath::new("ui/icon.png").unwrap();
        let (stem, constraint) = split_constraint(&path, None);
        assert_eq!(stem.as_str(), "ui/icon");
        assert_eq!(constraint.as_deref(), Some("png"));

        let bare = AssetPath::new("ui/icon").unwrap();
        let (stem, constraint) = split_constraint(&bare, None);
        assert_eq!(stem.as_str(), "ui/icon");
        assert_eq!(constraint, None);

        let explicit = AssetPath::new("config").unwrap();
        let (stem, constraint) = split_constraint(&explicit, Some("uvc"));
        assert_eq!(stem.as_str(), "config");
        assert_eq!(constraint.as_deref(), Some("uvc"));

        let doubled = AssetPath::new("config.uvc").unwrap();
        let (stem, constraint) = split_constraint(&doubled, Some(".uvc"));
        assert_eq!(stem.as_str(), "config");
        assert_eq!(constraint.as_deref(), Some("uvc"));
    }
}
