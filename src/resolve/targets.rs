// src/resolve/targets.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::paths::{normalize_path, path_str};

/// Caller-supplied ignore check, applied to normalized forward-slash path
/// strings.
pub type IgnorePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration for [`resolve_watch_targets`].
#[derive(Clone)]
pub struct ResolveOptions {
    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,

    /// Output directory of the compiler. The resolver never emits a path
    /// equal to it or nested under it; watching generated output would
    /// retrigger compiles forever.
    pub outdir: Option<PathBuf>,

    /// Drop any path whose normalized form contains the substring `"cache"`.
    /// On by default.
    pub ignore_cache: bool,

    /// Also collect the immediate parent directory of every kept file, so
    /// that files recreated by editors (write-temp-then-rename) keep
    /// triggering after their inode changes. On by default.
    pub include_directories: bool,

    /// Extra ignore check, e.g. compiled from user-supplied globs.
    pub ignore_path: Option<IgnorePredicate>,
}

impl ResolveOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            outdir: None,
            ignore_cache: true,
            include_directories: true,
            ignore_path: None,
        }
    }

    pub fn with_outdir(mut self, outdir: impl Into<PathBuf>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    pub fn with_ignore_path(mut self, predicate: IgnorePredicate) -> Self {
        self.ignore_path = Some(predicate);
        self
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("base_dir", &self.base_dir)
            .field("outdir", &self.outdir)
            .field("ignore_cache", &self.ignore_cache)
            .field("include_directories", &self.include_directories)
            .field("has_ignore_path", &self.ignore_path.is_some())
            .finish()
    }
}

/// The ignore checks derived from a [`ResolveOptions`], reusable for
/// filtering watch events after resolution.
#[derive(Clone)]
pub struct IgnoreRules {
    base_dir: PathBuf,
    ignore_cache: bool,
    /// Normalized string form of the resolved output directory, without a
    /// trailing separator.
    outdir: Option<String>,
    ignore_path: Option<IgnorePredicate>,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("ignore_cache", &self.ignore_cache)
            .field("outdir", &self.outdir)
            .finish_non_exhaustive()
    }
}

impl IgnoreRules {
    fn from_options(options: &ResolveOptions) -> Self {
        let outdir = options
            .outdir
            .as_deref()
            .map(|dir| path_str(&normalize_path(&options.base_dir, dir)));
        Self {
            base_dir: options.base_dir.clone(),
            ignore_cache: options.ignore_cache,
            outdir,
            ignore_path: options.ignore_path.clone(),
        }
    }

    /// True if `path` must never become a watch target or retrigger a
    /// compile: cache paths, the output directory and anything under it,
    /// and paths matched by the caller's predicate.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let normalized = path_str(&normalize_path(&self.base_dir, path));
        if self.ignore_cache && normalized.contains("cache") {
            return true;
        }
        if let Some(outdir) = &self.outdir {
            // Boundary-qualified: `/out` must not swallow `/output`.
            if normalized == *outdir || normalized.starts_with(&format!("{outdir}/")) {
                return true;
            }
        }
        match &self.ignore_path {
            Some(predicate) => predicate(&normalized),
            None => false,
        }
    }
}

/// The derived watch subscription for one committed compile pass.
#[derive(Clone)]
pub struct WatchTargets {
    pub files: BTreeSet<PathBuf>,
    pub directories: BTreeSet<PathBuf>,
    pub ignore: IgnoreRules,
}

impl fmt::Debug for WatchTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTargets")
            .field("files", &self.files.len())
            .field("directories", &self.directories.len())
            .finish_non_exhaustive()
    }
}

/// Convert a recorded read set into watch targets.
///
/// Pure: identical inputs and options produce identical outputs, regardless
/// of the iteration order of `paths`.
pub fn resolve_watch_targets<I>(paths: I, options: &ResolveOptions) -> WatchTargets
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let ignore = IgnoreRules::from_options(options);

    let mut files = BTreeSet::new();
    let mut directories = BTreeSet::new();

    for path in paths {
        let normalized = normalize_path(&options.base_dir, path.as_ref());
        if ignore.is_ignored(&normalized) {
            continue;
        }
        if options.include_directories
            && let Some(parent) = normalized.parent()
            && !ignore.is_ignored(parent)
        {
            directories.insert(parent.to_path_buf());
        }
        files.insert(normalized);
    }

    WatchTargets {
        files,
        directories,
        ignore,
    }
}

/// True iff `path` equals one of `directories` or is nested under one at a
/// separator boundary; `/project/other2/x` is not within `/project/other`.
///
/// Both sides are compared in normalized string form; inputs are expected to
/// be absolute.
pub fn is_within_directories<I>(path: &Path, directories: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let needle = path_str(path);
    for directory in directories {
        let dir = path_str(directory.as_ref());
        let dir = dir.trim_end_matches('/');
        if needle == dir || needle.starts_with(&format!("{dir}/")) {
            return true;
        }
    }
    false
}
