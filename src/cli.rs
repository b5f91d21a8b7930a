// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::compiler::{DEFAULT_OUTDIR, DEFAULT_PROJECT_PATH};

/// Command-line arguments for `msgwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "msgwatch",
    version,
    about = "Compile translation message sources into runtime modules, recompiling on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PROJECT_PATH)]
    pub project: String,

    /// Output directory for the generated modules.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTDIR)]
    pub outdir: String,

    /// Ordered locale-resolution strategies for the generated runtime.
    ///
    /// Example: --strategy cookie globalVariable baseLocale
    #[arg(long, value_name = "NAME", num_args = 1..)]
    pub strategy: Option<Vec<String>>,

    /// Only log errors to the console.
    #[arg(long)]
    pub silent: bool,

    /// Emit .d.ts declaration files for the generated output.
    #[arg(long)]
    pub emit_declarations: bool,

    /// Watch project files and recompile on change.
    #[arg(long)]
    pub watch: bool,

    /// Output layout: "locale-modules" or "message-modules".
    ///
    /// Defaults by build mode (MSGWATCH_ENV): development uses
    /// locale-modules, production uses message-modules.
    #[arg(long, value_name = "STRUCTURE")]
    pub output_structure: Option<String>,

    /// Extra ignore globs applied to watch targets (repeatable).
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MSGWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
