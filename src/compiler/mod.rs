// src/compiler/mod.rs

//! The message-to-code compiler contract and a minimal implementation.
//!
//! The driver in [`crate::engine`] treats the compiler as an external
//! collaborator behind the [`Compiler`] trait: it must be safely
//! re-invocable with the same configuration, perform all input reads through
//! the [`TrackedFs`] it is handed, and honor a previous
//! [`CompilationResult`] to skip unchanged work.
//!
//! [`MessageCompiler`] is the built-in implementation: it loads a TOML
//! project file, reads per-locale message JSON, and generates JavaScript
//! runtime modules (plus optional `.d.ts` declarations).
//!
//! [`TrackedFs`]: crate::fs::TrackedFs

pub mod message;
pub mod options;
pub mod project;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::fs::TrackedFs;

pub use message::MessageCompiler;
pub use options::{
    BuildMode, CompilerOptions, DEFAULT_OUTDIR, DEFAULT_PROJECT_PATH, OutputStructure,
    default_strategy, validate_strategy,
};
pub use project::ProjectFile;

/// Per-pass compile parameters.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub options: &'a CompilerOptions,

    /// Remove the output directory before generating. True exactly when
    /// there is no previous compilation to build on.
    pub clean_outdir: bool,
}

/// Accumulator returned by a successful compile and threaded into the next
/// pass. Opaque to the driver: it only stores the value, hands it back, and
/// drops it when a pass fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationResult {
    /// Content hash per input path, used to skip regeneration when nothing
    /// changed.
    pub input_hashes: BTreeMap<PathBuf, String>,

    /// Every output file the pass wrote (or kept).
    pub written_files: BTreeSet<PathBuf>,
}

/// The external compiler contract.
#[async_trait]
pub trait Compiler: Send {
    async fn compile(
        &self,
        request: &CompileRequest<'_>,
        fs: &TrackedFs,
        previous: Option<CompilationResult>,
    ) -> Result<CompilationResult>;
}
