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

//! Built-in converters for untyped payloads.
//!
//! Real codecs (images, audio, meshes) live outside this crate and plug in
//! through the same registration tables. The built-ins cover the two
//! degenerate cases every runtime needs anyway — raw bytes and UTF-8 text —
//! and both implement the precompiled fast path, so the whole pipeline is
//! exercisable without any external decoder.

use vellum_core::{
    ContentImporter, ContentProcessor, ConvertError, Intermediate, LoadedValue, SourceMetadata,
};

use crate::registry::{ImporterRegistration, ProcessorRegistration};

/// An opaque byte payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The raw file contents.
    pub bytes: Vec<u8>,
}

/// Imports any binary file as a [`Blob`].
pub struct BlobImporter;

impl ContentImporter for BlobImporter {
    fn output_type(&self) -> &'static str {
        std::any::type_name::<Blob>()
    }

    fn import(
        &self,
        bytes: &[u8],
        _metadata: &mut SourceMetadata,
    ) -> Result<Intermediate, ConvertError> {
        Ok(Intermediate::new(Blob {
            bytes: bytes.to_vec(),
        }))
    }
}

/// Imports UTF-8 text files as `String`.
pub struct TextImporter;

impl ContentImporter for TextImporter {
    fn output_type(&self) -> &'static str {
        std::any::type_name::<String>()
    }

    fn import(
        &self,
        bytes: &[u8],
        _metadata: &mut SourceMetadata,
    ) -> Result<Intermediate, ConvertError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ConvertError::Malformed {
            type_name: std::any::type_name::<String>().to_string(),
            detail: e.to_string(),
        })?;
        Ok(Intermediate::new(text.to_string()))
    }
}

/// Pass-through processor for [`Blob`] intermediates.
pub struct BlobProcessor;

impl ContentProcessor for BlobProcessor {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn input_type(&self) -> &'static str {
        std::any::type_name::<Blob>()
    }

    fn output_type(&self) -> &'static str {
        std::any::type_name::<Blob>()
    }

    fn process(
        &self,
        input: Intermediate,
        _metadata: &mut SourceMetadata,
    ) -> Result<LoadedValue, ConvertError> {
        Ok(LoadedValue::new(input.take::<Blob>()?))
    }

    fn read_precompiled(&self, payload: &[u8]) -> Result<LoadedValue, ConvertError> {
        Ok(LoadedValue::new(Blob {
            bytes: payload.to_vec(),
        }))
    }

    fn write_precompiled(&self, value: &LoadedValue) -> Result<Vec<u8>, ConvertError> {
        let blob = value
            .downcast_arc::<Blob>()
            .ok_or_else(|| ConvertError::WrongType {
                expected: std::any::type_name::<Blob>().to_string(),
                actual: value.type_name().to_string(),
            })?;
        Ok(blob.bytes.clone())
    }
}

/// Pass-through processor for `String` intermediates.
pub struct TextProcessor;

impl ContentProcessor for TextProcessor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn input_type(&self) -> &'static str {
        std::any::type_name::<String>()
    }

    fn output_type(&self) -> &'static str {
        std::any::type_name::<String>()
    }

    fn process(
        &self,
        input: Intermediate,
        _metadata: &mut SourceMetadata,
    ) -> Result<LoadedValue, ConvertError> {
        Ok(LoadedValue::new(input.take::<String>()?))
    }

    fn read_precompiled(&self, payload: &[u8]) -> Result<LoadedValue, ConvertError> {
        let text = std::str::from_utf8(payload).map_err(|e| ConvertError::Malformed {
            type_name: std::any::type_name::<String>().to_string(),
            detail: e.to_string(),
        })?;
        Ok(LoadedValue::new(text.to_string()))
    }

    fn write_precompiled(&self, value: &LoadedValue) -> Result<Vec<u8>, ConvertError> {
        let text = value
            .downcast_arc::<String>()
            .ok_or_else(|| ConvertError::WrongType {
                expected: std::any::type_name::<String>().to_string(),
                actual: value.type_name().to_string(),
            })?;
        Ok(text.as_bytes().to_vec())
    }
}

fn blob_importer() -> Box<dyn ContentImporter> {
    Box::new(BlobImporter)
}

fn text_importer() -> Box<dyn ContentImporter> {
    Box::new(TextImporter)
}

fn blob_processor() -> Box<dyn ContentProcessor> {
    Box::new(BlobProcessor)
}

fn text_processor() -> Box<dyn ContentProcessor> {
    Box::new(TextProcessor)
}

/// Static importer table folded into a registry at startup.
pub const IMPORTERS: &[ImporterRegistration] = &[
    ImporterRegistration {
        extensions: &["bin", "dat", "blob"],
        construct: blob_importer,
    },
    ImporterRegistration {
        extensions: &["txt", "text"],
        construct: text_importer,
    },
];

/// Static processor table folded into a registry at startup.
pub const PROCESSORS: &[ProcessorRegistration] = &[
    ProcessorRegistration {
        construct: blob_processor,
    },
    ProcessorRegistration {
        construct: text_processor,
    },
];
