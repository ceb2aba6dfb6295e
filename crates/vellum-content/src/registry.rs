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

//! Importer and processor registries.
//!
//! Registration is explicit: converter modules export static
//! [`ImporterRegistration`]/[`ProcessorRegistration`] tables that a fold
//! call installs at startup. There is no runtime type scanning; dispatch is
//! a pure table lookup by extension, by `(input, output)` type pair, or by
//! processor name for the precompiled fast path.

use ahash::AHashMap;
use std::sync::Arc;
use vellum_core::{ContentImporter, ContentProcessor, ConvertError};

/// A static entry binding file extensions to an importer constructor.
pub struct ImporterRegistration {
    /// The extensions (without dots) this importer handles.
    pub extensions: &'static [&'static str],
    /// Constructor for the importer instance.
    pub construct: fn() -> Box<dyn ContentImporter>,
}

/// A static entry contributing a processor constructor.
pub struct ProcessorRegistration {
    /// Constructor for the processor instance.
    pub construct: fn() -> Box<dyn ContentProcessor>,
}

/// The lookup tables the content manager dispatches conversions through.
#[derive(Default)]
pub struct ConverterRegistry {
    importers: AHashMap<String, Arc<dyn ContentImporter>>,
    processors: Vec<Arc<dyn ContentProcessor>>,
    by_pair: AHashMap<(String, String), usize>,
    by_name: AHashMap<String, usize>,
    default_for_input: AHashMap<String, usize>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in blob and text converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.fold_importers(crate::builtin::IMPORTERS);
        registry.fold_processors(crate::builtin::PROCESSORS);
        registry
    }

    /// Installs every importer in a static registration table.
    pub fn fold_importers(&mut self, registrations: &[ImporterRegistration]) {
        for registration in registrations {
            let importer: Arc<dyn ContentImporter> = Arc::from((registration.construct)());
            for extension in registration.extensions {
                self.register_importer(extension, importer.clone());
            }
        }
    }

    /// Installs every processor in a static registration table.
    pub fn fold_processors(&mut self, registrations: &[ProcessorRegistration]) {
        for registration in registrations {
            self.register_processor(Arc::from((registration.construct)()));
        }
    }

    /// Binds one extension to an importer. A later binding for the same
    /// extension replaces the earlier one.
    pub fn register_importer(&mut self, extension: &str, importer: Arc<dyn ContentImporter>) {
        self.importers.insert(extension.to_string(), importer);
    }

    /// Adds a processor to every dispatch table. The first processor
    /// registered for an input type becomes that type's default.
    pub fn register_processor(&mut self, processor: Arc<dyn ContentProcessor>) {
        let index = self.processors.len();
        let input = processor.input_type().to_string();
        let output = processor.output_type().to_string();
        self.by_pair.insert((input.clone(), output), index);
        self.by_name.insert(processor.name().to_string(), index);
        self.default_for_input.entry(input).or_insert(index);
        self.processors.push(processor);
    }

    /// The importer bound to `extension`.
    ///
    /// # Errors
    /// [`ConvertError::NoImporter`] when no binding exists.
    pub fn importer_for(&self, extension: &str) -> Result<&Arc<dyn ContentImporter>, ConvertError> {
        self.importers
            .get(extension)
            .ok_or_else(|| ConvertError::NoImporter {
                extension: extension.to_string(),
            })
    }

    /// The processor for an exact `(input, output)` type pair.
    ///
    /// # Errors
    /// [`ConvertError::NoProcessor`] when the pair is unbound.
    pub fn processor_for(
        &self,
        input: &str,
        output: &str,
    ) -> Result<&Arc<dyn ContentProcessor>, ConvertError> {
        self.by_pair
            .get(&(input.to_string(), output.to_string()))
            .map(|&i| &self.processors[i])
            .ok_or_else(|| ConvertError::NoProcessor {
                input: input.to_string(),
                output: output.to_string(),
            })
    }

    /// The default processor for an input type: the first one registered
    /// that consumes it.
    ///
    /// # Errors
    /// [`ConvertError::NoProcessor`] when nothing consumes `input`.
    pub fn default_processor(&self, input: &str) -> Result<&Arc<dyn ContentProcessor>, ConvertError> {
        self.default_for_input
            .get(input)
            .map(|&i| &self.processors[i])
            .ok_or_else(|| ConvertError::NoProcessor {
                input: input.to_string(),
                output: "<default>".to_string(),
            })
    }

    /// The processor registered under `name`, as referenced by a
    /// precompiled container.
    ///
    /// # Errors
    /// [`ConvertError::UnknownProcessor`] for an unresolvable name.
    pub fn processor_named(&self, name: &str) -> Result<&Arc<dyn ContentProcessor>, ConvertError> {
        self.by_name
            .get(name)
            .map(|&i| &self.processors[i])
            .ok_or_else(|| ConvertError::UnknownProcessor {
                name: name.to_string(),
            })
    }
}
