// src/fs/tracked.rs

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::fs::paths::normalize_path;

/// The closed set of read operations a compiler may perform.
///
/// Deliberately small: only calls listed here are tracked, so there is no
/// open-ended interception of unknown filesystem methods. Writes are not part
/// of this interface; generated output does not feed back into the watch set.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Synchronous buffered read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Synchronous text read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Future-style read for async call sites.
    async fn read_async(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Production [`FileSystem`] backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

#[async_trait]
impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    async fn read_async(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// In-memory [`FileSystem`] for tests and embedders that compile from
/// non-disk sources.
///
/// Paths are stored as given; callers should insert the same (absolute)
/// spellings they later read.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .expect("memory fs lock poisoned")
            .insert(path.into(), contents.into());
    }

    /// Remove a file; subsequent reads fail with `NotFound`.
    pub fn remove(&self, path: &Path) {
        self.files
            .lock()
            .expect("memory fs lock poisoned")
            .remove(path);
    }

    fn get(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .expect("memory fs lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.get(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn read_async(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path)
    }
}

/// A [`FileSystem`] wrapper that records every path read.
///
/// Each read operation normalizes its path argument and inserts it into the
/// shared read set *before* delegating to the underlying filesystem, so even
/// a failed read leaves a trace; the returned data and error behavior are
/// unchanged passthrough. The read-set mutation is the only side effect.
///
/// Clones share the same read set, which is how the compile executor and the
/// tests observe the same tracking state.
#[derive(Clone)]
pub struct TrackedFs {
    base_dir: PathBuf,
    inner: Arc<dyn FileSystem>,
    read_paths: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl std::fmt::Debug for TrackedFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedFs")
            .field("base_dir", &self.base_dir)
            .field("read_paths", &self.read_paths.lock().expect("read set lock poisoned").len())
            .finish_non_exhaustive()
    }
}

impl TrackedFs {
    /// Tracked view over the OS filesystem.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_fs(base_dir, Arc::new(OsFileSystem))
    }

    /// Tracked view over an arbitrary [`FileSystem`] implementation.
    pub fn with_fs(base_dir: impl Into<PathBuf>, inner: Arc<dyn FileSystem>) -> Self {
        Self {
            base_dir: base_dir.into(),
            inner,
            read_paths: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Directory that relative read paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record(&self, path: &Path) {
        let normalized = normalize_path(&self.base_dir, path);
        self.read_paths
            .lock()
            .expect("read set lock poisoned")
            .insert(normalized);
    }

    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.record(path);
        self.inner.read(path)
    }

    pub fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.record(path);
        self.inner.read_to_string(path)
    }

    pub async fn read_async(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.record(path);
        self.inner.read_async(path).await
    }

    /// Snapshot of all normalized paths read since the last [`clear`].
    ///
    /// [`clear`]: TrackedFs::clear
    pub fn read_paths(&self) -> BTreeSet<PathBuf> {
        self.read_paths
            .lock()
            .expect("read set lock poisoned")
            .clone()
    }

    /// Empty the read set. Called at the start of every compile pass.
    pub fn clear(&self) {
        self.read_paths
            .lock()
            .expect("read set lock poisoned")
            .clear();
    }

    /// Replace the read set with a previously taken snapshot.
    ///
    /// Used to roll back after a failed pass so watch coverage never shrinks
    /// because of an error.
    pub fn restore(&self, paths: BTreeSet<PathBuf>) {
        *self.read_paths.lock().expect("read set lock poisoned") = paths;
    }
}
