// tests/watch_targets.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use msgwatch::resolve::{ResolveOptions, is_within_directories, resolve_watch_targets};

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

fn set(items: &[&str]) -> BTreeSet<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[test]
fn collects_files_and_their_parent_directories() {
    let targets = resolve_watch_targets(
        paths(&["/project/messages/en.json", "/project/messages/de.json"]),
        &ResolveOptions::new("/project"),
    );

    assert_eq!(
        targets.files,
        set(&["/project/messages/en.json", "/project/messages/de.json"])
    );
    assert_eq!(targets.directories, set(&["/project/messages"]));
}

#[test]
fn cache_paths_are_excluded_by_default_and_kept_when_disabled() {
    let recorded = paths(&["/project/messages/en.json", "/project/cache/tmp.json"]);

    let targets = resolve_watch_targets(recorded.clone(), &ResolveOptions::new("/project"));
    assert_eq!(targets.files, set(&["/project/messages/en.json"]));
    assert_eq!(targets.directories, set(&["/project/messages"]));

    let mut options = ResolveOptions::new("/project");
    options.ignore_cache = false;
    let targets = resolve_watch_targets(recorded, &options);
    assert!(targets.files.contains(Path::new("/project/cache/tmp.json")));
    assert!(targets.directories.contains(Path::new("/project/cache")));
}

#[test]
fn outdir_and_descendants_never_become_targets() {
    for outdir in ["src/generated", "src/generated/", "/project/src/generated"] {
        let targets = resolve_watch_targets(
            paths(&[
                "/project/src/generated/messages.js",
                "/project/src/generated/deep/en.js",
                "/project/messages/en.json",
            ]),
            &ResolveOptions::new("/project").with_outdir(outdir),
        );

        assert_eq!(
            targets.files,
            set(&["/project/messages/en.json"]),
            "outdir spelling: {outdir}"
        );
        assert_eq!(targets.directories, set(&["/project/messages"]));
        assert!(targets.ignore.is_ignored(Path::new("/project/src/generated/new.js")));
    }
}

#[test]
fn sibling_directories_sharing_a_prefix_are_not_swallowed() {
    let targets = resolve_watch_targets(
        paths(&["/project/out2/en.json", "/project/outfit.json"]),
        &ResolveOptions::new("/project").with_outdir("/project/out"),
    );

    assert_eq!(
        targets.files,
        set(&["/project/out2/en.json", "/project/outfit.json"])
    );
    assert!(!targets.ignore.is_ignored(Path::new("/project/out2/en.json")));
    assert!(targets.ignore.is_ignored(Path::new("/project/out/en.js")));
    assert!(targets.ignore.is_ignored(Path::new("/project/out")));
}

#[test]
fn caller_predicate_is_applied_to_files_and_directories() {
    let options = ResolveOptions::new("/project")
        .with_ignore_path(Arc::new(|path: &str| path.ends_with(".tmp")));
    let targets = resolve_watch_targets(
        paths(&["/project/messages/en.json", "/project/messages/en.json.tmp"]),
        &options,
    );

    assert_eq!(targets.files, set(&["/project/messages/en.json"]));

    // A parent directory matched by the predicate is not collected even
    // though its file is kept.
    let options = ResolveOptions::new("/project")
        .with_ignore_path(Arc::new(|path: &str| path == "/project/msgs"));
    let targets = resolve_watch_targets(paths(&["/project/msgs/en.json"]), &options);
    assert_eq!(targets.files, set(&["/project/msgs/en.json"]));
    assert!(targets.directories.is_empty());
}

#[test]
fn directories_can_be_omitted() {
    let mut options = ResolveOptions::new("/project");
    options.include_directories = false;
    let targets = resolve_watch_targets(paths(&["/project/messages/en.json"]), &options);
    assert!(targets.directories.is_empty());
    assert_eq!(targets.files.len(), 1);
}

#[test]
fn resolution_is_pure_and_order_independent() {
    let options = ResolveOptions::new("/project").with_outdir("out");
    let forward = paths(&[
        "/project/a/x.json",
        "/project/b/y.json",
        "/project/out/z.js",
    ]);
    let mut reversed = forward.clone();
    reversed.reverse();

    let first = resolve_watch_targets(forward.clone(), &options);
    let second = resolve_watch_targets(forward, &options);
    let third = resolve_watch_targets(reversed, &options);

    assert_eq!(first.files, second.files);
    assert_eq!(first.directories, second.directories);
    assert_eq!(first.files, third.files);
    assert_eq!(first.directories, third.directories);
}

#[test]
fn within_check_respects_separator_boundaries() {
    let dirs = paths(&["/project/other", "/project/messages"]);

    assert!(is_within_directories(
        Path::new("/project/messages/nested/file.json"),
        &dirs
    ));
    assert!(is_within_directories(Path::new("/project/other"), &dirs));
    assert!(!is_within_directories(Path::new("/project/other2/x"), &dirs));
    assert!(!is_within_directories(
        Path::new("/project/unknown/file.json"),
        &dirs
    ));
}
