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

//! The shared watched wrapper: a live handle to one asset value.

use std::sync::Mutex;
use vellum_core::{AssetPath, ContentWatcher, DensityBucket, LoadedValue};

#[derive(Default)]
struct SharedState {
    current: Option<LoadedValue>,
    pending: Option<LoadedValue>,
}

/// A live, shareable handle to one (path, bucket) asset value.
///
/// Wrappers are memoized by the watch manager: every caller asking for the
/// same (path, bucket) gets the same instance. [`current`](Self::current)
/// always yields the last-known-good value, even while a revalidation is in
/// flight — the candidate sits in a separate slot until the handshake
/// commits or discards it.
pub struct SharedWatched {
    path: AssetPath,
    bucket: DensityBucket,
    state: Mutex<SharedState>,
}

impl SharedWatched {
    /// Creates a wrapper seeded with the initially loaded value.
    pub(crate) fn new(path: AssetPath, bucket: DensityBucket, value: LoadedValue) -> Self {
        Self {
            path,
            bucket,
            state: Mutex::new(SharedState {
                current: Some(value),
                pending: None,
            }),
        }
    }

    /// The watched logical path.
    pub fn path(&self) -> &AssetPath {
        &self.path
    }

    /// The density bucket this wrapper tracks.
    pub fn bucket(&self) -> DensityBucket {
        self.bucket
    }

    /// The last-known-good value. Available at all times, including while
    /// a reloaded candidate is being validated.
    pub fn current(&self) -> Option<LoadedValue> {
        self.state.lock().expect("shared watched poisoned").current.clone()
    }

    /// Whether a reloaded candidate is currently being validated.
    pub fn is_validating(&self) -> bool {
        self.state.lock().expect("shared watched poisoned").pending.is_some()
    }
}

impl ContentWatcher for SharedWatched {
    fn validating(&self, path: &AssetPath, value: &LoadedValue) -> bool {
        if *path == self.path {
            self.state.lock().expect("shared watched poisoned").pending = Some(value.clone());
        }
        // The wrapper itself never vetoes; policy belongs to explicit
        // watchers.
        true
    }

    fn validation_complete(&self, path: &AssetPath, value: Option<&LoadedValue>, validated: bool) {
        if *path != self.path {
            return;
        }
        let mut state = self.state.lock().expect("shared watched poisoned");
        if validated {
            if let Some(value) = value {
                state.current = Some(value.clone());
            }
        }
        state.pending = None;
    }
}
