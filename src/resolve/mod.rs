// src/resolve/mod.rs

//! Watch-target resolution.
//!
//! Turns the read set recorded by a compile pass into the minimal set of
//! files and parent directories worth watching, filtering out anything that
//! must never retrigger a compile (the output directory, cache paths, and
//! caller-supplied ignores).

pub mod targets;

pub use targets::{
    IgnorePredicate, IgnoreRules, ResolveOptions, WatchTargets, is_within_directories,
    resolve_watch_targets,
};
