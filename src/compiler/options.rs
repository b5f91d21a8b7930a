// src/compiler/options.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};

/// Default project file path, relative to the working directory.
pub const DEFAULT_PROJECT_PATH: &str = "./project.toml";

/// Default output directory for generated modules.
pub const DEFAULT_OUTDIR: &str = "./src/messages";

/// Locale-resolution strategies the generated runtime understands, in the
/// order the runtime tries them.
const KNOWN_STRATEGIES: &[&str] = &[
    "cookie",
    "baseLocale",
    "globalVariable",
    "url",
    "preferredLanguage",
    "localStorage",
];

/// Default strategy order when none is supplied.
pub fn default_strategy() -> Vec<String> {
    ["cookie", "globalVariable", "baseLocale"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Check a user-supplied strategy list against the known names.
pub fn validate_strategy(strategy: &[String]) -> Result<()> {
    if strategy.is_empty() {
        return Err(anyhow!("strategy list must not be empty"));
    }
    for name in strategy {
        if !KNOWN_STRATEGIES.contains(&name.as_str()) {
            return Err(anyhow!(
                "unknown strategy '{name}' (expected one of {})",
                KNOWN_STRATEGIES.join(", ")
            ));
        }
    }
    Ok(())
}

/// Whether the process compiles for development or for a production build.
///
/// Probed from the `MSGWATCH_ENV` environment variable; only used to pick
/// the default output structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub fn detect() -> Self {
        match std::env::var("MSGWATCH_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }
}

/// Layout of the generated output.
///
/// `LocaleModules` keeps one module per locale, which dev servers reload
/// fastest; `MessageModules` keeps one module per message, which bundlers
/// tree-shake best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStructure {
    LocaleModules,
    MessageModules,
}

impl OutputStructure {
    /// Default structure for a build mode: development favors reload speed,
    /// production favors tree shaking.
    pub fn default_for(mode: BuildMode) -> Self {
        match mode {
            BuildMode::Development => OutputStructure::LocaleModules,
            BuildMode::Production => OutputStructure::MessageModules,
        }
    }
}

impl FromStr for OutputStructure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "locale-modules" => Ok(OutputStructure::LocaleModules),
            "message-modules" => Ok(OutputStructure::MessageModules),
            other => Err(format!(
                "invalid output structure: {other} (expected \"locale-modules\" or \"message-modules\")"
            )),
        }
    }
}

impl fmt::Display for OutputStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStructure::LocaleModules => f.write_str("locale-modules"),
            OutputStructure::MessageModules => f.write_str("message-modules"),
        }
    }
}

/// Configuration shared by the one-shot command, watch mode, and host
/// build-tool integration.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Path to the project file (TOML).
    pub project_path: PathBuf,

    /// Directory the generated modules are written to.
    pub outdir: PathBuf,

    pub output_structure: OutputStructure,

    /// Emit `.d.ts` declarations next to the generated modules.
    pub emit_declarations: bool,

    /// Ordered locale-resolution strategies baked into the generated
    /// runtime.
    pub strategy: Vec<String>,
}
