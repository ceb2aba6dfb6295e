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

//! Importer and processor contracts, and the type-erased value carriers
//! that flow between them.
//!
//! The conversion pipeline is two-stage: a [`ContentImporter`] turns raw
//! bytes into an [`Intermediate`] representation, and a [`ContentProcessor`]
//! turns that intermediate into the typed, cache-ready [`LoadedValue`].
//! Both stages are synchronous and may block on nothing but CPU work; file
//! I/O happens before import and is never performed by a converter.

use crate::metadata::SourceMetadata;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An error produced by an importer or processor.
#[derive(Debug)]
pub enum ConvertError {
    /// No importer is registered for the file extension.
    NoImporter {
        /// The extension that failed dispatch.
        extension: String,
    },
    /// No processor is registered for the (input, output) type pair.
    NoProcessor {
        /// Type name produced by the importer.
        input: String,
        /// Type name the caller asked for.
        output: String,
    },
    /// A precompiled container named a processor that is not registered.
    UnknownProcessor {
        /// The unresolvable processor-type name.
        name: String,
    },
    /// The source bytes were not valid for the converter that parsed them.
    Malformed {
        /// The converter's output type name.
        type_name: String,
        /// What went wrong.
        detail: String,
    },
    /// The processor does not implement the precompiled fast path.
    PrecompiledUnsupported {
        /// The processor's registered name.
        processor: String,
    },
    /// A converter was handed a value of a type it did not expect.
    WrongType {
        /// The type the converter expected.
        expected: String,
        /// The type it actually received.
        actual: String,
    },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::NoImporter { extension } => {
                write!(f, "No importer registered for extension '{extension}'")
            }
            ConvertError::NoProcessor { input, output } => {
                write!(f, "No processor registered for '{input}' -> '{output}'")
            }
            ConvertError::UnknownProcessor { name } => {
                write!(f, "Precompiled container names unknown processor '{name}'")
            }
            ConvertError::Malformed { type_name, detail } => {
                write!(f, "Malformed source data for '{type_name}': {detail}")
            }
            ConvertError::PrecompiledUnsupported { processor } => {
                write!(f, "Processor '{processor}' has no precompiled form")
            }
            ConvertError::WrongType { expected, actual } => {
                write!(f, "Expected a value of type '{expected}', got '{actual}'")
            }
        }
    }
}

impl std::error::Error for ConvertError {}

/// A typed, shareable asset instance behind a type-erased handle.
///
/// Cloning is cheap (one `Arc` bump) and never duplicates the asset data.
/// Cache hits hand back clones of the stored value, so identity is
/// observable through [`LoadedValue::ptr_eq`].
#[derive(Clone)]
pub struct LoadedValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl LoadedValue {
    /// Wraps a freshly produced asset instance.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The static type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the wrapped value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        (*self.value).is::<T>()
    }

    /// Returns a shared handle to the wrapped value as `T`, or `None` when
    /// the types do not match.
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(a: &LoadedValue, b: &LoadedValue) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }
}

impl fmt::Debug for LoadedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// The importer's output: a boxed value between import and process.
pub struct Intermediate {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Intermediate {
    /// Wraps an importer's output value.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The static type name of the carried value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Unwraps the carried value as `T`.
    ///
    /// # Errors
    /// [`ConvertError::WrongType`] when the carried value is not a `T`.
    pub fn take<T: 'static>(self) -> Result<T, ConvertError> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| ConvertError::WrongType {
                expected: std::any::type_name::<T>().to_string(),
                actual: type_name.to_string(),
            })
    }
}

impl fmt::Debug for Intermediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intermediate")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Converts raw source bytes into an [`Intermediate`] value.
///
/// Importers are dispatched by file extension. An importer may declare
/// dependencies on other files through the metadata it is handed; those
/// declarations feed the dependency graph that drives cascading reloads.
pub trait ContentImporter: Send + Sync {
    /// The type name of the [`Intermediate`] this importer produces. Used
    /// to pair the importer with a processor.
    fn output_type(&self) -> &'static str;

    /// Parses `bytes` into the intermediate representation.
    fn import(
        &self,
        bytes: &[u8],
        metadata: &mut SourceMetadata,
    ) -> Result<Intermediate, ConvertError>;
}

/// Converts an [`Intermediate`] value into the final [`LoadedValue`].
///
/// Processors are dispatched by `(input_type, output_type)` pair. A
/// processor may additionally implement the precompiled fast path, letting
/// a `.uvc` container bypass import/process entirely.
pub trait ContentProcessor: Send + Sync {
    /// The processor-type name written into precompiled containers.
    fn name(&self) -> &'static str;

    /// Type name of the intermediate this processor consumes.
    fn input_type(&self) -> &'static str;

    /// Type name of the value this processor produces.
    fn output_type(&self) -> &'static str;

    /// Transforms the intermediate into the cache-ready value.
    fn process(
        &self,
        input: Intermediate,
        metadata: &mut SourceMetadata,
    ) -> Result<LoadedValue, ConvertError>;

    /// Deserializes a precompiled payload produced by
    /// [`write_precompiled`](ContentProcessor::write_precompiled).
    fn read_precompiled(&self, _payload: &[u8]) -> Result<LoadedValue, ConvertError> {
        Err(ConvertError::PrecompiledUnsupported {
            processor: self.name().to_string(),
        })
    }

    /// Serializes a loaded value into a precompiled payload.
    fn write_precompiled(&self, _value: &LoadedValue) -> Result<Vec<u8>, ConvertError> {
        Err(ConvertError::PrecompiledUnsupported {
            processor: self.name().to_string(),
        })
    }
}
