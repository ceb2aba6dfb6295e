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
use tempfile::{tempdir, TempDir};
use vellum_core::{AssetPath, DensityBucket};
use vellum_io::{DensityResolver, ResolvedForm, ResolveError, ResolveFlags, SearchRoots};

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn roots_with_override(base: &TempDir, over: &TempDir) -> SearchRoots {
    SearchRoots::new(base.path()).with_override(over.path())
}

#[test]
fn override_beats_base_and_earlier_overrides() {
    let base = tempdir().unwrap();
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(base.path(), "ui/icon.png", b"base");
    write(first.path(), "ui/icon.png", b"first");
    write(second.path(), "ui/icon.png", b"second");

    let resolver = DensityResolver::new(
        SearchRoots::new(base.path())
            .with_override(first.path())
            .with_override(second.path()),
    );
    let resolved = resolver
        .resolve(
            &AssetPath::new("ui/icon").unwrap(),
            None,
            DensityBucket::Medium,
            ResolveFlags::DEFAULT,
        )
        .unwrap();

    assert!(resolved.physical_path.starts_with(second.path()));
    assert_eq!(resolved.override_origin.as_deref(), Some(second.path()));
    assert_eq!(fs::read(&resolved.physical_path).unwrap(), b"second");
}

#[test]
fn density_variant_in_override_beats_plain_base() {
    // End-to-end scenario from the resolver contract: "ui/icon" at High
    // with an override holding icon-high.png and the base holding
    // icon.png must yield the override's suffixed variant.
    let base = tempdir().unwrap();
    let over = tempdir().unwrap();
    write(base.path(), "ui/icon.png", b"base plain");
    write(over.path(), "ui/icon-high.png", b"override high");

    let resolver = DensityResolver::new(roots_with_override(&base, &over));
    let resolved = resolver
        .resolve(
            &AssetPath::new("ui/icon").unwrap(),
            None,
            DensityBucket::High,
            ResolveFlags::DEFAULT,
        )
        .unwrap();

    assert_eq!(
        resolved.physical_path,
        over.path().join("ui/icon-high.png")
    );
    assert_eq!(resolved.bucket, DensityBucket::High);
    assert!(resolved.override_origin.is_some());
}

#[test]
fn density_fallback_never_exceeds_request() {
    let base = tempdir().unwrap();
    write(base.path(), "icon-low.png", b"low");
    write(base.path(), "icon-medium.png", b"medium");
    write(base.path(), "icon-extraextrahigh.png", b"xxh");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let resolved = resolver
        .resolve(
            &AssetPath::new("icon").unwrap(),
            None,
            DensityBucket::ExtraHigh,
            ResolveFlags::DEFAULT,
        )
        .unwrap();

    // The best available bucket at or below ExtraHigh is Medium; the
    // ExtraExtraHigh variant is above the ceiling and must not win.
    assert_eq!(resolved.bucket, DensityBucket::Medium);
    assert!(resolved.physical_path.ends_with("icon-medium.png"));
}

#[test]
fn density_substitution_requires_extensionless_request() {
    let base = tempdir().unwrap();
    write(base.path(), "icon.png", b"plain");
    write(base.path(), "icon-high.png", b"high");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let resolved = resolver
        .resolve(
            &AssetPath::new("icon.png").unwrap(),
            None,
            DensityBucket::High,
            ResolveFlags::DEFAULT,
        )
        .unwrap();

    assert!(resolved.physical_path.ends_with("icon.png"));
}

#[test]
fn ambiguous_raw_match_is_fatal() {
    let base = tempdir().unwrap();
    write(base.path(), "icon.png", b"png");
    write(base.path(), "icon.jpg", b"jpg");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let err = resolver
        .resolve(
            &AssetPath::new("icon").unwrap(),
            None,
            DensityBucket::Medium,
            ResolveFlags::DEFAULT,
        )
        .unwrap_err();

    match err {
        ResolveError::Ambiguous { candidates, .. } => {
            assert_eq!(candidates, vec!["icon.jpg".to_string(), "icon.png".to_string()]);
        }
        other => panic!("expected Ambiguous, got {other:?}"),
    }
}

#[test]
fn explicit_extension_disambiguates() {
    let base = tempdir().unwrap();
    write(base.path(), "icon.png", b"png");
    write(base.path(), "icon.jpg", b"jpg");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let resolved = resolver
        .resolve(
            &AssetPath::new("icon").unwrap(),
            Some("jpg"),
            DensityBucket::Medium,
            ResolveFlags::DEFAULT,
        )
        .unwrap();
    assert!(resolved.physical_path.ends_with("icon.jpg"));
}

#[test]
fn precompiled_form_wins_over_wrapper_and_raw() {
    let base = tempdir().unwrap();
    write(base.path(), "config.uvc", b"compiled");
    write(base.path(), "config.json", br#"{"source": "config.txt"}"#);
    write(base.path(), "config.txt", b"raw");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let resolved = resolver
        .resolve(
            &AssetPath::new("config").unwrap(),
            None,
            DensityBucket::Desktop,
            ResolveFlags::DEFAULT,
        )
        .unwrap();
    assert_eq!(resolved.form, ResolvedForm::Precompiled);
    assert!(resolved.physical_path.ends_with("config.uvc"));

    // With the precompiled candidate excluded, the wrapper is next.
    let resolved = resolver
        .resolve(
            &AssetPath::new("config").unwrap(),
            None,
            DensityBucket::Desktop,
            ResolveFlags::DENSITY_VARIANTS,
        )
        .unwrap();
    assert!(matches!(resolved.form, ResolvedForm::Wrapper(_)));
}

#[test]
fn explicit_precompiled_extension_beside_wrapper() {
    // Loading "config" with the explicit precompiled extension must pick
    // the container even though a same-stem wrapper file sits beside it.
    let base = tempdir().unwrap();
    write(base.path(), "config.uvc", b"compiled");
    write(base.path(), "config.ron", br#"(source: "config.txt")"#);
    write(base.path(), "config.txt", b"raw");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let resolved = resolver
        .resolve(
            &AssetPath::new("config").unwrap(),
            Some("uvc"),
            DensityBucket::Desktop,
            ResolveFlags::DEFAULT,
        )
        .unwrap();
    assert_eq!(resolved.form, ResolvedForm::Precompiled);
}

#[test]
fn wrapper_source_is_chased_into_metadata() {
    let base = tempdir().unwrap();
    write(base.path(), "ui/icon.ron", br#"(source: "icon.png", importer: {"premultiply": "true"})"#);
    write(base.path(), "ui/icon.png", b"png");

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let source = resolver
        .resolve_source(
            &AssetPath::new("ui/icon").unwrap(),
            None,
            DensityBucket::Medium,
            ResolveFlags::NONE,
        )
        .unwrap();

    assert!(!source.precompiled);
    assert_eq!(source.metadata.physical_path, base.path().join("ui/icon.png"));
    assert_eq!(source.metadata.extension, "png");
    assert_eq!(
        source.metadata.importer_data.get("premultiply").map(String::as_str),
        Some("true")
    );
    // The wrapper itself is a declared dependency of the asset.
    assert!(source
        .metadata
        .dependencies()
        .iter()
        .any(|(file, _)| file.ends_with("icon.ron")));
}

#[test]
fn wrapper_with_missing_source_is_fatal() {
    let base = tempdir().unwrap();
    write(base.path(), "icon.ron", br#"(source: "gone.png")"#);

    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let err = resolver
        .resolve_source(
            &AssetPath::new("icon").unwrap(),
            None,
            DensityBucket::Medium,
            ResolveFlags::DEFAULT,
        )
        .unwrap_err();
    assert!(matches!(err, ResolveError::Wrapper { .. }));
}

#[test]
fn fallback_roots_searched_first_then_packaged() {
    let base = tempdir().unwrap();
    let dev = tempdir().unwrap();
    write(base.path(), "shader.txt", b"packaged");
    write(dev.path(), "shader.txt", b"dev tree");

    let resolver =
        DensityResolver::new(SearchRoots::new(base.path()).with_fallback(dev.path()));
    let flags = ResolveFlags::DEFAULT | ResolveFlags::FALLBACK_ROOTS;

    let resolved = resolver
        .resolve(&AssetPath::new("shader").unwrap(), None, DensityBucket::Desktop, flags)
        .unwrap();
    assert!(resolved.from_dev_tree);
    assert!(resolved.physical_path.starts_with(dev.path()));

    // A file absent from the developer tree falls through to the
    // packaged root.
    write(base.path(), "only_packaged.txt", b"packaged");
    let resolved = resolver
        .resolve(
            &AssetPath::new("only_packaged").unwrap(),
            None,
            DensityBucket::Desktop,
            flags,
        )
        .unwrap();
    assert!(!resolved.from_dev_tree);
    assert!(resolved.physical_path.starts_with(base.path()));
}

#[test]
fn not_found_reports_the_logical_path() {
    let base = tempdir().unwrap();
    let resolver = DensityResolver::new(SearchRoots::new(base.path()));
    let err = resolver
        .resolve(
            &AssetPath::new("missing/asset").unwrap(),
            None,
            DensityBucket::Medium,
            ResolveFlags::DEFAULT,
        )
        .unwrap_err();
    match err {
        ResolveError::NotFound { path } => assert_eq!(path.as_str(), "missing/asset"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}
