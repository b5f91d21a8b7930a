// src/watch/backend.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Callback fired when a watched path changes.
///
/// For directory watches the argument carries the resolved path of the
/// changed entry when the platform can name it; `None` means "something in
/// the watched path changed" without further detail. File watches always
/// pass `None` — the watched path itself is the subject.
///
/// Callbacks run on the watch backend's own thread and must only schedule
/// work (send on a channel), never execute compiler logic.
pub type ChangeCallback = Box<dyn Fn(Option<PathBuf>) + Send + Sync + 'static>;

/// An active OS watch on a single path.
pub trait WatchHandle: Send {
    /// Release the underlying OS resource. Called exactly once per handle,
    /// either when the path drops out of the watch targets or at shutdown.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Minimal capability interface over platform watch APIs.
///
/// One handle per watched path; recursive watching, rename-vs-write event
/// shapes and other platform differences stay inside the adapter.
pub trait WatchBackend: Send {
    fn watch_file(&mut self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>>;

    fn watch_directory(
        &mut self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>>;
}

/// Production [`WatchBackend`] built on the `notify` crate.
///
/// Every watched path gets its own non-recursive watcher so that each
/// registry entry owns exactly one closable OS handle.
#[derive(Debug, Default)]
pub struct NotifyBackend;

impl NotifyBackend {
    pub fn new() -> Self {
        Self
    }

    fn watch(
        &mut self,
        path: &Path,
        directory: bool,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        // Backend errors are not actionable here; the watch
                        // stays registered and keeps reporting.
                        eprintln!("msgwatch: file watch error: {err}");
                        return;
                    }
                };

                // Reads of watched files show up as access events; acting on
                // them would retrigger compiles from our own reads.
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }

                if directory {
                    if event.paths.is_empty() {
                        on_change(None);
                    } else {
                        for changed in &event.paths {
                            on_change(Some(changed.clone()));
                        }
                    }
                } else {
                    on_change(None);
                }
            },
            Config::default(),
        )
        .with_context(|| format!("creating watcher for {}", path.display()))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", path.display()))?;

        Ok(Box::new(NotifyHandle {
            watcher,
            path: path.to_path_buf(),
        }))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch_file(&mut self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>> {
        self.watch(path, false, on_change)
    }

    fn watch_directory(
        &mut self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>> {
        self.watch(path, true, on_change)
    }
}

struct NotifyHandle {
    watcher: RecommendedWatcher,
    path: PathBuf,
}

impl WatchHandle for NotifyHandle {
    fn close(mut self: Box<Self>) -> Result<()> {
        self.watcher
            .unwatch(&self.path)
            .with_context(|| format!("unwatching {}", self.path.display()))
        // Dropping the watcher releases the OS resource even if unwatch
        // failed, e.g. because the path vanished.
    }
}
