// tests/watcher_reconcile.rs

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use common::{MockBackend, fire_dir, fire_file};
use msgwatch::engine::SessionEvent;
use msgwatch::resolve::{ResolveOptions, WatchTargets, resolve_watch_targets};
use msgwatch::watch::WatcherManager;

fn targets(files: &[&str]) -> WatchTargets {
    let options = ResolveOptions::new("/proj").with_outdir("/proj/out");
    resolve_watch_targets(files.iter().map(PathBuf::from), &options)
}

fn manager() -> (
    WatcherManager,
    Arc<std::sync::Mutex<common::MockState>>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    let backend = MockBackend::new();
    let state = Arc::clone(&backend.state);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    (
        WatcherManager::new(Box::new(backend), events_tx),
        state,
        events_rx,
    )
}

fn requested_path(event: SessionEvent) -> PathBuf {
    match event {
        SessionEvent::CompileRequested { path } => path,
        other => panic!("expected CompileRequested, got {other:?}"),
    }
}

#[test]
fn reconcile_applies_the_minimal_add_remove_set() {
    let (mut manager, state, _events_rx) = manager();

    manager.reconcile(&targets(&["/proj/msgs/a.json", "/proj/msgs/b.json"]));
    assert_eq!(
        manager.watched_files(),
        vec![PathBuf::from("/proj/msgs/a.json"), PathBuf::from("/proj/msgs/b.json")]
    );
    assert_eq!(manager.watched_directories(), vec![PathBuf::from("/proj/msgs")]);

    // Same targets again: nothing is created or closed.
    let created_before = state.lock().unwrap().created.len();
    manager.reconcile(&targets(&["/proj/msgs/a.json", "/proj/msgs/b.json"]));
    assert_eq!(state.lock().unwrap().created.len(), created_before);
    assert!(state.lock().unwrap().closed.is_empty());

    // b.json drops out: its handle is closed exactly once.
    manager.reconcile(&targets(&["/proj/msgs/a.json"]));
    assert_eq!(manager.watched_files(), vec![PathBuf::from("/proj/msgs/a.json")]);
    assert_eq!(
        state.lock().unwrap().closed,
        vec![PathBuf::from("/proj/msgs/b.json")]
    );
}

#[test]
fn a_failed_watch_creation_does_not_abort_the_rest() {
    let (mut manager, state, _events_rx) = manager();
    state
        .lock()
        .unwrap()
        .fail_watch
        .insert(PathBuf::from("/proj/msgs/b.json"));

    manager.reconcile(&targets(&["/proj/msgs/a.json", "/proj/msgs/b.json"]));

    // Partial coverage: everything except the refused path is watched.
    assert_eq!(manager.watched_files(), vec![PathBuf::from("/proj/msgs/a.json")]);
    assert_eq!(manager.watched_directories(), vec![PathBuf::from("/proj/msgs")]);

    // Once the path can be watched again, reconciliation picks it up.
    state.lock().unwrap().fail_watch.clear();
    manager.reconcile(&targets(&["/proj/msgs/a.json", "/proj/msgs/b.json"]));
    assert_eq!(manager.watched_files().len(), 2);
}

#[test]
fn file_events_schedule_compiles_keyed_to_their_own_path() {
    let (mut manager, state, mut events_rx) = manager();
    manager.reconcile(&targets(&["/proj/msgs/a.json"]));

    fire_file(&state, Path::new("/proj/msgs/a.json"));

    let event = events_rx.try_recv().expect("one scheduled compile");
    assert_eq!(requested_path(event), PathBuf::from("/proj/msgs/a.json"));
    assert!(events_rx.try_recv().is_err());
}

#[test]
fn directory_events_resolve_filenames_and_drop_ignored_paths() {
    let (mut manager, state, mut events_rx) = manager();
    manager.reconcile(&targets(&["/proj/msgs/a.json"]));

    // Named entry: scheduled under the entry's resolved path.
    fire_dir(
        &state,
        Path::new("/proj/msgs"),
        Some(PathBuf::from("/proj/msgs/new.json")),
    );
    let event = events_rx.try_recv().expect("one scheduled compile");
    assert_eq!(requested_path(event), PathBuf::from("/proj/msgs/new.json"));

    // No entry name from the backend: scheduled under the directory itself.
    fire_dir(&state, Path::new("/proj/msgs"), None);
    let event = events_rx.try_recv().expect("one scheduled compile");
    assert_eq!(requested_path(event), PathBuf::from("/proj/msgs"));

    // Ignored entries are dropped before scheduling: output directory and
    // cache paths.
    fire_dir(
        &state,
        Path::new("/proj/msgs"),
        Some(PathBuf::from("/proj/out/messages.js")),
    );
    fire_dir(
        &state,
        Path::new("/proj/msgs"),
        Some(PathBuf::from("/proj/msgs/cache.json")),
    );
    assert!(events_rx.try_recv().is_err());
}

#[test]
fn shutdown_closes_everything_even_when_a_close_fails() {
    let (mut manager, state, _events_rx) = manager();
    manager.reconcile(&targets(&["/proj/msgs/a.json", "/proj/msgs/b.json"]));
    state
        .lock()
        .unwrap()
        .fail_close
        .insert(PathBuf::from("/proj/msgs/a.json"));

    manager.shutdown();

    assert!(manager.watched_files().is_empty());
    assert!(manager.watched_directories().is_empty());

    // Both files and the parent directory were closed; the failing close
    // was swallowed.
    let closed = state.lock().unwrap().closed.clone();
    assert_eq!(closed.len(), 3);
    assert!(closed.contains(&PathBuf::from("/proj/msgs/a.json")));
    assert!(closed.contains(&PathBuf::from("/proj/msgs/b.json")));
    assert!(closed.contains(&PathBuf::from("/proj/msgs")));
}

#[test]
fn registry_keys_stay_a_subset_of_the_reconciled_targets() {
    let (mut manager, _state, _events_rx) = manager();

    manager.reconcile(&targets(&["/proj/a/x.json", "/proj/b/y.json"]));
    manager.reconcile(&targets(&["/proj/b/y.json", "/proj/c/z.json"]));

    let current = targets(&["/proj/b/y.json", "/proj/c/z.json"]);
    for file in manager.watched_files() {
        assert!(current.files.contains(&file));
    }
    for dir in manager.watched_directories() {
        assert!(current.directories.contains(&dir));
    }
}
