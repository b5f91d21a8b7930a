// src/watch/manager.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::SessionEvent;
use crate::resolve::WatchTargets;
use crate::watch::backend::{ChangeCallback, WatchBackend, WatchHandle};

/// Owns the active OS watch subscriptions.
///
/// Two registries (files and directories) map normalized paths to live watch
/// handles. The registries are mutated only during [`reconcile`] and
/// [`shutdown`], and every handle is closed exactly once: either when its
/// path drops out of the targets, or at shutdown.
///
/// [`reconcile`]: WatcherManager::reconcile
/// [`shutdown`]: WatcherManager::shutdown
pub struct WatcherManager {
    backend: Box<dyn WatchBackend>,
    files: BTreeMap<PathBuf, Box<dyn WatchHandle>>,
    directories: BTreeMap<PathBuf, Box<dyn WatchHandle>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl std::fmt::Debug for WatcherManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherManager")
            .field("files", &self.files.len())
            .field("directories", &self.directories.len())
            .finish_non_exhaustive()
    }
}

impl WatcherManager {
    pub fn new(
        backend: Box<dyn WatchBackend>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            backend,
            files: BTreeMap::new(),
            directories: BTreeMap::new(),
            events_tx,
        }
    }

    /// Diff the registries against `targets` and apply the minimal
    /// add/remove set.
    ///
    /// Stale watches are closed first; missing ones are then created. A
    /// failed watch creation is logged and skipped — partial watch coverage
    /// is a degraded state, not a reason to abort the remaining paths.
    pub fn reconcile(&mut self, targets: &WatchTargets) {
        let stale_files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| !targets.files.contains(*path))
            .cloned()
            .collect();
        for path in stale_files {
            if let Some(handle) = self.files.remove(&path) {
                close_handle(handle, &path);
            }
        }

        let stale_directories: Vec<PathBuf> = self
            .directories
            .keys()
            .filter(|path| !targets.directories.contains(*path))
            .cloned()
            .collect();
        for path in stale_directories {
            if let Some(handle) = self.directories.remove(&path) {
                close_handle(handle, &path);
            }
        }

        for path in &targets.files {
            if self.files.contains_key(path) {
                continue;
            }
            let on_change = self.file_callback(path.clone());
            match self.backend.watch_file(path, on_change) {
                Ok(handle) => {
                    debug!(path = %path.display(), "watching file");
                    self.files.insert(path.clone(), handle);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to watch file");
                }
            }
        }

        for path in &targets.directories {
            if self.directories.contains_key(path) {
                continue;
            }
            let on_change = self.directory_callback(path.clone(), targets);
            match self.backend.watch_directory(path, on_change) {
                Ok(handle) => {
                    debug!(path = %path.display(), "watching directory");
                    self.directories.insert(path.clone(), handle);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to watch directory");
                }
            }
        }
    }

    /// A file watch schedules a compile keyed to its own path.
    fn file_callback(&self, path: PathBuf) -> ChangeCallback {
        let events_tx = self.events_tx.clone();
        Box::new(move |_changed| {
            let _ = events_tx.send(SessionEvent::CompileRequested { path: path.clone() });
        })
    }

    /// A directory watch schedules a compile keyed to the changed entry when
    /// the backend names one, or to the directory itself otherwise. Entries
    /// that resolve to an ignored path are dropped without scheduling.
    fn directory_callback(&self, directory: PathBuf, targets: &WatchTargets) -> ChangeCallback {
        let events_tx = self.events_tx.clone();
        let ignore = targets.ignore.clone();
        Box::new(move |changed| {
            let path = match changed {
                Some(entry) => {
                    if ignore.is_ignored(&entry) {
                        return;
                    }
                    entry
                }
                None => directory.clone(),
            };
            let _ = events_tx.send(SessionEvent::CompileRequested { path });
        })
    }

    /// Close every registered handle and clear both registries.
    pub fn shutdown(&mut self) {
        debug!(
            files = self.files.len(),
            directories = self.directories.len(),
            "closing all watches"
        );
        for (path, handle) in std::mem::take(&mut self.files) {
            close_handle(handle, &path);
        }
        for (path, handle) in std::mem::take(&mut self.directories) {
            close_handle(handle, &path);
        }
    }

    /// Currently watched file paths, mainly for logging and tests.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// Currently watched directory paths, mainly for logging and tests.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.directories.keys().cloned().collect()
    }
}

/// Closing is best-effort: a handle that fails to release cleanly is logged
/// and forgotten, never propagated.
fn close_handle(handle: Box<dyn WatchHandle>, path: &std::path::Path) {
    if let Err(err) = handle.close() {
        debug!(path = %path.display(), error = %err, "failed to close watch handle");
    }
}
