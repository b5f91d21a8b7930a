// src/engine/mod.rs

//! Compilation orchestration.
//!
//! This module ties together:
//! - the debounce/coalesce scheduler deciding *when* a compile pass runs
//! - the compilation driver running one pass end to end, including read-set
//!   rollback and watch reconciliation
//! - the watch session event loop that reacts to:
//!   - change notifications from watch callbacks
//!   - pass completions from the compile executor task
//!   - shutdown requests

pub mod driver;
pub mod scheduler;
pub mod session;

pub use driver::CompilationDriver;
pub use scheduler::{CompileScheduler, DEBOUNCE_QUIET_PERIOD, NotifyOutcome, PassRequest};
pub use session::{ExecutorRequest, SessionEvent, WatchSession, spawn_compile_executor};
