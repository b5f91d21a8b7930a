// src/engine/driver.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::compiler::{CompilationResult, CompileRequest, Compiler, CompilerOptions};
use crate::fs::TrackedFs;
use crate::resolve::{ResolveOptions, WatchTargets, resolve_watch_targets};
use crate::watch::WatcherManager;

/// Runs one compile pass end to end: snapshot the read set, clear it, invoke
/// the compiler, then commit (resolve targets, reconcile watches) or roll
/// back (restore the read set, drop the incremental state).
///
/// All previously-global state lives here as fields: the previous
/// compilation result threaded into the next pass, and the committed watch
/// targets. One driver instance is constructed per session.
pub struct CompilationDriver<C> {
    compiler: C,
    fs: TrackedFs,
    options: CompilerOptions,
    resolve: ResolveOptions,
    previous: Option<CompilationResult>,
    watchers: Option<WatcherManager>,
    committed_targets: Option<WatchTargets>,
}

impl<C: Compiler> CompilationDriver<C> {
    pub fn new(compiler: C, fs: TrackedFs, options: CompilerOptions, resolve: ResolveOptions) -> Self {
        Self {
            compiler,
            fs,
            options,
            resolve,
            previous: None,
            watchers: None,
            committed_targets: None,
        }
    }

    /// Attach a watcher manager; its registries are reconciled after every
    /// successful pass. Without one, callers register the committed targets
    /// with their host themselves (build-tool integration).
    pub fn with_watchers(mut self, watchers: WatcherManager) -> Self {
        self.watchers = Some(watchers);
        self
    }

    /// Run one compile pass.
    ///
    /// On success the fresh read set becomes the committed dependency set
    /// and the watch registries are reconciled against it. On failure the
    /// read set is restored to the last committed one — watch coverage never
    /// shrinks because of a failed pass — and the previous compilation
    /// result is dropped, so the next pass recomputes from scratch with a
    /// clean output directory. Watch registries are not touched on failure.
    pub async fn run_pass(&mut self, changed: Option<&Path>) -> Result<()> {
        match changed {
            Some(path) => info!(path = %path.display(), "recompiling, watched path changed"),
            None => info!("compiling message project"),
        }

        let previously_read = self.fs.read_paths();
        self.fs.clear();

        let clean_outdir = self.previous.is_none();
        let previous = self.previous.take();
        let request = CompileRequest {
            options: &self.options,
            clean_outdir,
        };

        match self.compiler.compile(&request, &self.fs, previous).await {
            Ok(result) => {
                self.previous = Some(result);
                let targets = resolve_watch_targets(self.fs.read_paths(), &self.resolve);
                debug!(?targets, "resolved watch targets");
                if let Some(watchers) = self.watchers.as_mut() {
                    watchers.reconcile(&targets);
                }
                self.committed_targets = Some(targets);
                info!("compilation complete");
                Ok(())
            }
            Err(err) => {
                self.fs.clear();
                self.fs.restore(previously_read);
                Err(err)
            }
        }
    }

    /// Close all watches. Called once when the session ends.
    pub fn shutdown(&mut self) {
        if let Some(watchers) = self.watchers.as_mut() {
            watchers.shutdown();
        }
    }

    /// Targets from the last committed pass, if any pass succeeded yet.
    pub fn watch_targets(&self) -> Option<&WatchTargets> {
        self.committed_targets.as_ref()
    }

    /// All committed watch paths (files and directories), for hosts that
    /// register watches themselves.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        match &self.committed_targets {
            Some(targets) => targets
                .files
                .iter()
                .chain(targets.directories.iter())
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// The tracked filesystem this driver compiles through.
    pub fn fs(&self) -> &TrackedFs {
        &self.fs
    }

    /// Paths currently watched by the attached manager, for logging and
    /// tests.
    pub fn watchers(&self) -> Option<&WatcherManager> {
        self.watchers.as_ref()
    }
}
