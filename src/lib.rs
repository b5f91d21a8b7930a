// src/lib.rs

pub mod cli;
pub mod compiler;
pub mod engine;
pub mod fs;
pub mod integrate;
pub mod logging;
pub mod resolve;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::compiler::{
    BuildMode, CompileRequest, Compiler, CompilerOptions, MessageCompiler, OutputStructure,
    default_strategy, validate_strategy,
};
use crate::engine::{CompilationDriver, ExecutorRequest, SessionEvent, WatchSession, spawn_compile_executor};
use crate::fs::{TrackedFs, normalize_path};
use crate::resolve::{IgnorePredicate, ResolveOptions};
use crate::watch::{NotifyBackend, WatcherManager};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - compiler options from CLI flags and the build-mode probe
/// - the one-shot compile path (exit code is the caller's concern)
/// - the watch session: tracked filesystem, driver, watcher manager,
///   scheduler loop, executor task, and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let base_dir = std::env::current_dir().context("determining working directory")?;

    let project_path = normalize_path(&base_dir, Path::new(&args.project));
    let outdir = normalize_path(&base_dir, Path::new(&args.outdir));

    let output_structure = match &args.output_structure {
        Some(value) => value.parse().map_err(|e: String| anyhow!(e))?,
        None => OutputStructure::default_for(BuildMode::detect()),
    };

    let strategy = args.strategy.clone().unwrap_or_else(default_strategy);
    validate_strategy(&strategy)?;

    let options = CompilerOptions {
        project_path,
        outdir,
        output_structure,
        emit_declarations: args.emit_declarations,
        strategy,
    };

    if args.watch {
        run_watch(base_dir, options, &args.ignore).await
    } else {
        run_once(base_dir, options).await
    }
}

/// One-shot compile: a single full pass with a clean output directory.
async fn run_once(base_dir: PathBuf, options: CompilerOptions) -> Result<()> {
    info!(structure = %options.output_structure, "compiling message project");

    let fs = TrackedFs::new(base_dir);
    let request = CompileRequest {
        options: &options,
        clean_outdir: true,
    };
    MessageCompiler
        .compile(&request, &fs, None)
        .await
        .context("compiling message project")?;

    info!("successfully compiled message project");
    Ok(())
}

/// Watch mode: compile once, then recompile whenever a dependency changes,
/// until a termination signal arrives.
async fn run_watch(base_dir: PathBuf, options: CompilerOptions, ignore_globs: &[String]) -> Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (requests_tx, requests_rx) = mpsc::channel::<ExecutorRequest>(4);

    let mut resolve = ResolveOptions::new(base_dir.clone()).with_outdir(options.outdir.clone());
    if let Some(predicate) = build_ignore_predicate(ignore_globs)? {
        resolve = resolve.with_ignore_path(predicate);
    }

    let fs = TrackedFs::new(base_dir);
    let watchers = WatcherManager::new(Box::new(NotifyBackend::new()), events_tx.clone());
    let driver =
        CompilationDriver::new(MessageCompiler, fs, options, resolve).with_watchers(watchers);

    let executor = spawn_compile_executor(driver, requests_rx, events_tx.clone());

    // Ctrl-C → graceful shutdown. Registered here by the hosting CLI layer;
    // the session itself only knows the explicit shutdown event.
    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(SessionEvent::ShutdownRequested);
        });
    }

    info!("watching for changes");
    WatchSession::new(events_rx, requests_tx).run().await?;

    // Wait for the executor to close all watches before exiting.
    executor.await.context("compile executor task failed")?;
    Ok(())
}

/// Compile user-supplied `--ignore` globs into the resolver's predicate.
///
/// Globs are matched against normalized forward-slash path strings, so
/// absolute patterns like `/project/**/*.tmp` and bare ones like `**/*.tmp`
/// both work.
fn build_ignore_predicate(globs: &[String]) -> Result<Option<IgnorePredicate>> {
    if globs.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid ignore glob: {pattern}"))?;
        builder.add(glob);
    }
    let set: GlobSet = builder.build().context("building ignore glob set")?;

    Ok(Some(Arc::new(move |path: &str| set.is_match(path))))
}
