// src/integrate.rs

//! Host build-tool integration hooks.
//!
//! Three generic hooks, independent of any specific bundler's plugin
//! protocol: run a pass when the host build starts, react to a host-reported
//! path change, and probe the build mode to pick a default output structure.
//! The host owns the actual file watching — these hooks return the paths it
//! should register — so no watcher manager is attached here.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::compiler::{BuildMode, Compiler, CompilerOptions};
use crate::engine::{CompilationDriver, CompileScheduler, NotifyOutcome};
use crate::fs::{TrackedFs, normalize_path};
use crate::resolve::{ResolveOptions, is_within_directories};

/// One long-lived integration instance per host build. Holds the previous
/// compilation and build mode as fields; nothing is ambient.
pub struct BuildIntegration<C: Compiler> {
    driver: CompilationDriver<C>,
    scheduler: CompileScheduler,
    mode: BuildMode,
    base_dir: PathBuf,
}

impl<C: Compiler> BuildIntegration<C> {
    pub fn new(compiler: C, fs: TrackedFs, options: CompilerOptions) -> Self {
        let base_dir = fs.base_dir().to_path_buf();
        let resolve = ResolveOptions::new(base_dir.clone()).with_outdir(options.outdir.clone());
        Self {
            driver: CompilationDriver::new(compiler, fs, options, resolve),
            scheduler: CompileScheduler::new(),
            mode: BuildMode::detect(),
            base_dir,
        }
    }

    /// Override the probed build mode. Hosts with their own mode signal
    /// (and tests) use this instead of the environment probe.
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// The probed build mode, for hosts that pick the default output
    /// structure from it.
    pub fn build_mode(&self) -> BuildMode {
        self.mode
    }

    /// Run one compile pass and return the watch paths the host should
    /// register.
    ///
    /// In development a failed pass is logged and the previously committed
    /// coverage is returned, so watching continues and the next save
    /// retries; in production the error is fatal.
    pub async fn build_start(&mut self) -> Result<Vec<PathBuf>> {
        if let Err(err) = self.driver.run_pass(None).await {
            if self.mode == BuildMode::Production {
                return Err(err);
            }
            warn!("failed to compile message project: {err:#}");
        }
        Ok(self.driver.watch_paths())
    }

    /// The host reported a change to a watched path.
    ///
    /// Changes to ignored paths, or to paths outside the committed
    /// dependency set, are dropped. Otherwise passes run until no coalesced
    /// re-run is pending. Returns the watch paths the host should
    /// (re-)register afterwards.
    pub async fn watched_path_changed(&mut self, path: &Path) -> Vec<PathBuf> {
        let normalized = normalize_path(&self.base_dir, path);
        let relevant = match self.driver.watch_targets() {
            Some(targets) => {
                !targets.ignore.is_ignored(&normalized)
                    && (targets.files.contains(&normalized)
                        || is_within_directories(&normalized, &targets.directories))
            }
            None => false,
        };
        if !relevant {
            debug!(path = %normalized.display(), "change does not affect the message project");
            return self.driver.watch_paths();
        }

        match self.scheduler.notify(Some(normalized)) {
            // Host hooks are serialized through `&mut self`, so a pass can
            // never be in flight here; kept for scheduler-state consistency.
            NotifyOutcome::Deferred => {}
            NotifyOutcome::Debounce => {
                // Hosts debounce change batches themselves; run right away.
                let mut next = self.scheduler.debounce_elapsed();
                while let Some(pass) = next {
                    if let Err(err) = self.driver.run_pass(pass.changed.as_deref()).await {
                        warn!("failed to recompile message project: {err:#}");
                    }
                    next = self.scheduler.finish_pass();
                }
            }
        }
        self.driver.watch_paths()
    }
}
