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

use std::fs;
use std::path::Path;
use tempfile::tempdir;
use vellum_content::{AssetFlags, ContentConfig, ContentError, ContentManager};
use vellum_core::{AssetPath, DensityBucket, LoadedValue};
use vellum_io::{ResolveError, ResolveFlags};

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn path(s: &str) -> AssetPath {
    AssetPath::new(s).unwrap()
}

#[test]
fn cache_returns_the_same_instance() {
    let base = tempdir().unwrap();
    write(base.path(), "greeting.txt", b"hello");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let first = manager.load(&path("greeting"), DensityBucket::Medium).unwrap();
    let second = manager.load(&path("greeting"), DensityBucket::Medium).unwrap();
    assert!(LoadedValue::ptr_eq(&first, &second));

    // A different bucket on the same path is a miss for that bucket.
    let other_bucket = manager.load(&path("greeting"), DensityBucket::High).unwrap();
    assert!(!LoadedValue::ptr_eq(&first, &other_bucket));
}

#[test]
fn typed_load_checks_the_output_type() {
    let base = tempdir().unwrap();
    write(base.path(), "greeting.txt", b"hello");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let text = manager
        .load_as::<String>(&path("greeting"), DensityBucket::Medium)
        .unwrap();
    assert_eq!(*text, "hello");

    let err = manager
        .load_as::<u32>(&path("greeting"), DensityBucket::Medium)
        .unwrap_err();
    assert!(matches!(err, ContentError::WrongType { .. }));
}

#[test]
fn override_directory_wins_through_the_manager() {
    let base = tempdir().unwrap();
    let over = tempdir().unwrap();
    write(base.path(), "ui/label.txt", b"base");
    write(over.path(), "ui/label.txt", b"override");

    let manager = ContentManager::new(
        ContentConfig::new(base.path()).with_override(over.path()),
    );
    let text = manager
        .load_as::<String>(&path("ui/label"), DensityBucket::Medium)
        .unwrap();
    assert_eq!(*text, "override");
}

#[test]
fn density_variant_resolves_end_to_end() {
    let base = tempdir().unwrap();
    let over = tempdir().unwrap();
    write(base.path(), "ui/icon.txt", b"plain");
    write(over.path(), "ui/icon-high.txt", b"high variant");

    let manager = ContentManager::new(
        ContentConfig::new(base.path()).with_override(over.path()),
    );
    let text = manager
        .load_as::<String>(&path("ui/icon"), DensityBucket::High)
        .unwrap();
    assert_eq!(*text, "high variant");
}

#[test]
fn preprocess_then_load_precompiled() {
    let base = tempdir().unwrap();
    write(base.path(), "config.txt", b"key=value");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    // Bake the container next to a same-stem wrapper file; the explicit
    // precompiled extension must pick the container.
    let out = manager
        .preprocess(&path("config"), DensityBucket::Desktop, base.path())
        .unwrap();
    assert!(out.ends_with("config.uvc"));
    write(base.path(), "config.json", br#"{"source": "config.txt"}"#);

    let value = manager
        .load_with(&path("config"), Some("uvc"), DensityBucket::Desktop, ResolveFlags::DEFAULT)
        .unwrap();
    assert_eq!(*value.downcast_arc::<String>().unwrap(), "key=value");
}

#[test]
fn extensionless_load_prefers_the_container() {
    let base = tempdir().unwrap();
    write(base.path(), "config.txt", b"from source");
    let manager = ContentManager::new(ContentConfig::new(base.path()));
    manager
        .preprocess(&path("config"), DensityBucket::Desktop, base.path())
        .unwrap();
    // Overwrite the raw source after baking: a loader that consulted the
    // raw form would see the new text.
    write(base.path(), "config.txt", b"changed later");

    let value = manager.load(&path("config"), DensityBucket::Desktop).unwrap();
    assert_eq!(*value.downcast_arc::<String>().unwrap(), "from source");
}

#[test]
fn initial_load_failures_propagate() {
    let base = tempdir().unwrap();
    write(base.path(), "broken.txt", &[0xff, 0xfe, 0xfd]);
    write(base.path(), "strange.xyz", b"?");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let missing = manager.load(&path("absent"), DensityBucket::Medium).unwrap_err();
    assert!(matches!(
        missing,
        ContentError::Resolve(ResolveError::NotFound { .. })
    ));

    let malformed = manager.load(&path("broken"), DensityBucket::Medium).unwrap_err();
    assert!(matches!(malformed, ContentError::Convert { .. }));

    let undispatched = manager.load(&path("strange"), DensityBucket::Medium).unwrap_err();
    assert!(matches!(undispatched, ContentError::Convert { .. }));
}

#[test]
fn purge_all_forces_a_fresh_import() {
    let base = tempdir().unwrap();
    write(base.path(), "greeting.txt", b"hello");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let first = manager.load(&path("greeting"), DensityBucket::Medium).unwrap();
    manager.purge(true);
    let second = manager.load(&path("greeting"), DensityBucket::Medium).unwrap();
    assert!(!LoadedValue::ptr_eq(&first, &second));
}

#[test]
fn partial_purge_respects_pinning() {
    let base = tempdir().unwrap();
    write(base.path(), "pinned.txt", b"stays");
    write(base.path(), "loose.txt", b"goes");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let pinned_v1 = manager.load(&path("pinned"), DensityBucket::Medium).unwrap();
    let loose_v1 = manager.load(&path("loose"), DensityBucket::Medium).unwrap();
    manager.set_flags(&path("pinned"), AssetFlags::PINNED);

    manager.purge(false);

    let pinned_v2 = manager.load(&path("pinned"), DensityBucket::Medium).unwrap();
    let loose_v2 = manager.load(&path("loose"), DensityBucket::Medium).unwrap();
    assert!(LoadedValue::ptr_eq(&pinned_v1, &pinned_v2));
    assert!(!LoadedValue::ptr_eq(&loose_v1, &loose_v2));
    assert!(manager.flags(&path("pinned")).unwrap().contains(AssetFlags::PINNED));
}

#[test]
fn density_purge_keeps_the_active_bucket() {
    let base = tempdir().unwrap();
    write(base.path(), "icon.txt", b"icon");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let low = manager.load(&path("icon"), DensityBucket::Low).unwrap();
    let high = manager.load(&path("icon"), DensityBucket::High).unwrap();

    manager.purge_unused_densities(DensityBucket::High);

    let high_again = manager.load(&path("icon"), DensityBucket::High).unwrap();
    assert!(LoadedValue::ptr_eq(&high, &high_again));
    let low_again = manager.load(&path("icon"), DensityBucket::Low).unwrap();
    assert!(!LoadedValue::ptr_eq(&low, &low_again));
}

#[test]
fn import_and_process_as_individual_stages() {
    let base = tempdir().unwrap();
    write(base.path(), "greeting.txt", b"staged");
    let manager = ContentManager::new(ContentConfig::new(base.path()));

    let (intermediate, mut metadata) = manager
        .import(&path("greeting"), DensityBucket::Medium)
        .unwrap();
    assert_eq!(metadata.extension, "txt");
    let value = manager.process(intermediate, &mut metadata).unwrap();
    assert_eq!(*value.downcast_arc::<String>().unwrap(), "staged");
    // Staged conversion does not populate the cache.
    assert!(!manager.is_cached(&path("greeting"), DensityBucket::Medium));
}
