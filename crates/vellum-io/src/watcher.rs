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

//! Filesystem change notifications for hot reload.
//!
//! [`FileWatchService`] wraps the platform watcher (`notify`: inotify,
//! FSEvents, or ReadDirectoryChangesW) and forwards content-change events
//! from the OS callback thread into a channel. Nothing is reloaded here:
//! the handler only enqueues, and the owning runtime drains the channel on
//! its designated single-writer thread.
//!
//! Availability is decided once, when the service is constructed:
//! always-on for the primary desktop targets (Windows, macOS), opt-in via
//! the `VELLUM_FILE_WATCH` environment toggle on other unix targets, and
//! off on mobile and wasm. Setting the toggle to `0`/`false` force-disables
//! watching everywhere.

use crossbeam_channel::{Receiver, Sender};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The environment toggle gating filesystem watching on platforms where it
/// is not enabled by default.
pub const WATCH_ENV_TOGGLE: &str = "VELLUM_FILE_WATCH";

/// One changed file, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the file that changed.
    pub path: PathBuf,
}

/// An error produced while installing a filesystem watch.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Watching is disabled on this platform or by the environment toggle.
    #[error("Filesystem watching is not available on this platform")]
    Unsupported,
    /// The platform watcher failed.
    #[error("Failed to install filesystem watch")]
    Backend(#[from] notify::Error),
}

/// A subscription to filesystem changes under one or more content roots.
pub struct FileWatchService {
    watcher: RecommendedWatcher,
    receiver: Receiver<WatchEvent>,
    roots: Vec<PathBuf>,
}

impl FileWatchService {
    /// Whether filesystem watching can be enabled in this process.
    pub fn supported() -> bool {
        if cfg!(any(target_os = "android", target_os = "ios", target_arch = "wasm32")) {
            return false;
        }
        match std::env::var(WATCH_ENV_TOGGLE) {
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") => false,
            Ok(_) => true,
            Err(_) => cfg!(any(target_os = "windows", target_os = "macos")),
        }
    }

    /// Starts the platform watcher with no roots subscribed yet.
    ///
    /// # Errors
    /// [`WatchError::Unsupported`] when watching is gated off;
    /// [`WatchError::Backend`] when the platform watcher cannot start.
    pub fn new() -> Result<Self, WatchError> {
        if !Self::supported() {
            return Err(WatchError::Unsupported);
        }
        let (sender, receiver) = crossbeam_channel::unbounded();
        let watcher = notify::recommended_watcher(move |result| {
            forward_event(&sender, result);
        })?;
        Ok(Self {
            watcher,
            receiver,
            roots: Vec::new(),
        })
    }

    /// Subscribes to changes under `root`, recursively. Re-subscribing an
    /// already-watched root is a no-op, so registrations can share one
    /// service freely.
    pub fn watch_root(&mut self, root: &Path) -> Result<(), WatchError> {
        if self.roots.iter().any(|r| r == root) {
            return Ok(());
        }
        if !root.is_dir() {
            // Roots may be configured before they exist (e.g. an override
            // directory created later); skip silently, callers re-register.
            log::debug!("Watch root {} does not exist yet, skipping", root.display());
            return Ok(());
        }
        self.watcher.watch(root, RecursiveMode::Recursive)?;
        log::debug!("Watching content root {}", root.display());
        self.roots.push(root.to_path_buf());
        Ok(())
    }

    /// The channel change events are forwarded into. Events are enqueued
    /// from the OS callback thread; drain from the owning thread only.
    pub fn receiver(&self) -> &Receiver<WatchEvent> {
        &self.receiver
    }

    /// The roots currently subscribed.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl Drop for FileWatchService {
    fn drop(&mut self) {
        // Unwatch explicitly so OS handles are released deterministically
        // even if the backend's own Drop is lazy about it.
        for root in std::mem::take(&mut self.roots) {
            if let Err(e) = self.watcher.unwatch(&root) {
                log::debug!("Failed to unwatch {}: {e}", root.display());
            }
        }
    }
}

/// Runs on notify's background thread: filter to content changes and
/// enqueue. Never touches engine state.
fn forward_event(sender: &Sender<WatchEvent>, result: Result<notify::Event, notify::Error>) {
    match result {
        Ok(event) => {
            if !is_content_change(&event.kind) {
                return;
            }
            for path in event.paths {
                if sender.send(WatchEvent { path }).is_err() {
                    // Receiver dropped; the service is being torn down.
                    return;
                }
            }
        }
        Err(e) => log::warn!("Filesystem watcher error: {e}"),
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn watching_forced_on() -> bool {
        // Unit tests only exercise the real backend where the toggle or the
        // platform default enables it.
        FileWatchService::supported()
    }

    #[test]
    fn unsupported_platforms_report_cleanly() {
        if watching_forced_on() {
            return;
        }
        assert!(matches!(FileWatchService::new(), Err(WatchError::Unsupported)));
    }

    #[test]
    fn reports_file_modification() {
        if !watching_forced_on() {
            return;
        }
        let dir = tempdir().unwrap();
        let file = dir.path().join("asset.txt");
        fs::write(&file, b"v1").unwrap();

        let mut service = FileWatchService::new().unwrap();
        service.watch_root(dir.path()).unwrap();
        fs::write(&file, b"v2").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while std::time::Instant::now() < deadline {
            if let Ok(event) = service.receiver().recv_timeout(Duration::from_millis(100)) {
                if event.path.ends_with("asset.txt") {
                    seen = true;
                    break;
                }
            }
        }
        assert!(seen, "expected a change event for asset.txt");
    }

    #[test]
    fn duplicate_roots_are_collapsed() {
        if !watching_forced_on() {
            return;
        }
        let dir = tempdir().unwrap();
        let mut service = FileWatchService::new().unwrap();
        service.watch_root(dir.path()).unwrap();
        service.watch_root(dir.path()).unwrap();
        assert_eq!(service.roots().len(), 1);
    }
}
