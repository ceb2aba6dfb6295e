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

//! Wrapper metadata files (sidecars).
//!
//! A wrapper stands in for an asset file and points at it, optionally
//! carrying importer- and processor-specific key/value blocks. Two grammars
//! are accepted, dispatched by extension: Rusty notation (`.ron`) and
//! object notation (`.json`). Both deserialize into the same
//! [`WrapperDoc`].
//!
//! ```ron
//! (
//!     source: "icon.png",
//!     importer: { "premultiply": "true" },
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ext;

/// Which wrapper grammar a sidecar file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    /// Rusty notation (`.ron`).
    Ron,
    /// Object notation (`.json`).
    Json,
}

impl WrapperKind {
    /// Maps a reserved wrapper extension to its grammar.
    pub fn from_extension(extension: &str) -> Option<WrapperKind> {
        match extension {
            e if e == ext::WRAPPER_RON => Some(WrapperKind::Ron),
            e if e == ext::WRAPPER_JSON => Some(WrapperKind::Json),
            _ => None,
        }
    }
}

/// An error produced while reading a wrapper file.
#[derive(Debug, Error)]
pub enum WrapperError {
    /// The RON form failed to parse.
    #[error("Invalid RON wrapper: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// The JSON form failed to parse.
    #[error("Invalid JSON wrapper: {0}")]
    Json(#[from] serde_json::Error),
    /// The wrapped file the sidecar references does not exist. This is a
    /// fatal resolution error, not a fall-through.
    #[error("Wrapper references '{reference}' but '{resolved}' does not exist")]
    MissingSource {
        /// The reference as written in the wrapper.
        reference: String,
        /// The path the reference resolved to.
        resolved: PathBuf,
    },
}

/// The parsed contents of a wrapper metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperDoc {
    /// Path of the wrapped file, relative to the wrapper's directory.
    pub source: String,
    /// Importer-specific side-channel data.
    #[serde(default)]
    pub importer: BTreeMap<String, String>,
    /// Processor-specific side-channel data.
    #[serde(default)]
    pub processor: BTreeMap<String, String>,
}

impl WrapperDoc {
    /// Parses wrapper text in the given grammar.
    pub fn parse(kind: WrapperKind, text: &str) -> Result<WrapperDoc, WrapperError> {
        match kind {
            WrapperKind::Ron => Ok(ron::de::from_str(text)?),
            WrapperKind::Json => Ok(serde_json::from_str(text)?),
        }
    }

    /// Resolves the wrapped file relative to the wrapper's directory.
    ///
    /// # Errors
    /// [`WrapperError::MissingSource`] when the referenced file does not
    /// exist on disk.
    pub fn locate_source(&self, wrapper_dir: &Path) -> Result<PathBuf, WrapperError> {
        let resolved = wrapper_dir.join(&self.source);
        if resolved.is_file() {
            Ok(resolved)
        } else {
            Err(WrapperError::MissingSource {
                reference: self.source.clone(),
                resolved,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_ron_form() {
        let doc = WrapperDoc::parse(
            WrapperKind::Ron,
            r#"(source: "icon.png", importer: {"premultiply": "true"})"#,
        )
        .unwrap();
        assert_eq!(doc.source, "icon.png");
        assert_eq!(doc.importer.get("premultiply").map(String::as_str), Some("true"));
        assert!(doc.processor.is_empty());
    }

    #[test]
    fn parses_json_form() {
        let doc = WrapperDoc::parse(
            WrapperKind::Json,
            r#"{"source": "icon.png", "processor": {"format": "bgra"}}"#,
        )
        .unwrap();
        assert_eq!(doc.source, "icon.png");
        assert_eq!(doc.processor.get("format").map(String::as_str), Some("bgra"));
    }

    #[test]
    fn malformed_text_errors() {
        assert!(WrapperDoc::parse(WrapperKind::Ron, "(source: )").is_err());
        assert!(WrapperDoc::parse(WrapperKind::Json, "{source}").is_err());
    }

    #[test]
    fn locates_source_next_to_wrapper() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("icon.png"), b"png").unwrap();

        let doc = WrapperDoc {
            source: "icon.png".to_string(),
            importer: BTreeMap::new(),
            processor: BTreeMap::new(),
        };
        assert_eq!(doc.locate_source(dir.path()).unwrap(), dir.path().join("icon.png"));
    }

    #[test]
    fn missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let doc = WrapperDoc {
            source: "gone.png".to_string(),
            importer: BTreeMap::new(),
            processor: BTreeMap::new(),
        };
        assert!(matches!(
            doc.locate_source(dir.path()),
            Err(WrapperError::MissingSource { .. })
        ));
    }
}
