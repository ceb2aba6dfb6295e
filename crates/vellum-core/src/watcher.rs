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

//! The reload-validation capability exposed to asset consumers.

use crate::convert::LoadedValue;
use crate::path::AssetPath;

/// A consumer's hook into the reload protocol.
///
/// Watchers are invoked strictly in registration order. During a reload the
/// manager first asks every watcher [`validating`](ContentWatcher::validating)
/// and stops at the first rejection; afterwards every watcher consulted is
/// told the outcome through
/// [`validation_complete`](ContentWatcher::validation_complete).
///
/// This is deliberately a narrow two-method capability rather than an
/// open-ended observer interface: implementations cannot reorder, retry, or
/// re-enter the reload, only accept or reject the candidate value.
pub trait ContentWatcher: Send + Sync {
    /// Inspects a freshly reloaded candidate value. Returning `false`
    /// rejects the reload; the cache keeps the last-known-good value.
    fn validating(&self, _path: &AssetPath, _value: &LoadedValue) -> bool {
        true
    }

    /// Reports the outcome of a reload. `value` is the accepted instance
    /// when `validated` is true, and `None` after a rejection or a swallowed
    /// reload failure.
    fn validation_complete(&self, path: &AssetPath, value: Option<&LoadedValue>, validated: bool);
}
