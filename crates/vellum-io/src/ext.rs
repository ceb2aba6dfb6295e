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

//! Reserved file extensions.
//!
//! Three extensions are claimed by the runtime itself; every other
//! extension is an importer-dispatch key.

/// Extension of the precompiled binary container (see [`crate::compiled`]).
pub const PRECOMPILED: &str = "uvc";

/// Extension of the Rusty-notation wrapper metadata form.
pub const WRAPPER_RON: &str = "ron";

/// Extension of the object-notation (JSON) wrapper metadata form.
pub const WRAPPER_JSON: &str = "json";

/// The two wrapper forms, in resolution-precedence order.
pub const WRAPPER_EXTENSIONS: [&str; 2] = [WRAPPER_RON, WRAPPER_JSON];

/// Whether `ext` is claimed by the runtime rather than an importer.
pub fn is_reserved(ext: &str) -> bool {
    ext == PRECOMPILED || ext == WRAPPER_RON || ext == WRAPPER_JSON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_set() {
        assert!(is_reserved("uvc"));
        assert!(is_reserved("ron"));
        assert!(is_reserved("json"));
        assert!(!is_reserved("png"));
        assert!(!is_reserved("txt"));
    }
}
