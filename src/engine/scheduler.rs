// src/engine/scheduler.rs

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

/// Quiet period a burst of change notifications must outlast before a
/// compile pass starts.
pub const DEBOUNCE_QUIET_PERIOD: Duration = Duration::from_millis(100);

/// One unit of work for the compile executor.
///
/// `changed` is the path that triggered the pass, used for logging; a
/// coalesced re-run carries no path and always compiles the full project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRequest {
    pub changed: Option<PathBuf>,
}

/// What the session loop should do after a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// (Re)arm the debounce timer; a pass starts when it elapses.
    Debounce,
    /// A pass is running; the notification was folded into the single
    /// trailing re-run.
    Deferred,
}

/// Debounce and coalescing state for compile passes.
///
/// Semantics:
/// - While idle, notifications restart a single debounce timer and only the
///   most recent path is remembered; when the timer elapses, exactly one
///   pass runs for that path.
/// - While a pass is running, notifications set a `requested` flag and
///   nothing else; when the pass completes, one trailing full pass starts
///   immediately, with no debounce delay.
///
/// Consequences: passes never overlap, and an unbounded burst of
/// notifications during one pass collapses into exactly one trailing pass.
///
/// The scheduler holds no timer itself — the session loop owns the actual
/// sleep and reports back via [`debounce_elapsed`], which keeps these
/// transitions testable without time control.
///
/// [`debounce_elapsed`]: CompileScheduler::debounce_elapsed
#[derive(Debug, Default)]
pub struct CompileScheduler {
    in_progress: bool,
    requested: bool,
    pending: Option<PathBuf>,
}

impl CompileScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change notification.
    pub fn notify(&mut self, path: Option<PathBuf>) -> NotifyOutcome {
        if self.in_progress {
            // Coalesced re-runs always recompile the whole project, so no
            // path is recorded here.
            self.requested = true;
            debug!("compile already in progress, queued one re-run");
            NotifyOutcome::Deferred
        } else {
            self.pending = path;
            NotifyOutcome::Debounce
        }
    }

    /// The debounce timer elapsed without being superseded: start a pass.
    ///
    /// Returns `None` if a pass is already running, which can only happen if
    /// the caller let a stale timer fire.
    pub fn debounce_elapsed(&mut self) -> Option<PassRequest> {
        if self.in_progress {
            return None;
        }
        self.in_progress = true;
        Some(PassRequest {
            changed: self.pending.take(),
        })
    }

    /// Mark a pass as started outside the debounce path (the mandatory
    /// first full pass of a watch session).
    pub fn begin_pass(&mut self) {
        debug_assert!(!self.in_progress);
        self.in_progress = true;
    }

    /// A pass completed (success or failure). Returns the trailing pass to
    /// start immediately if notifications arrived while it ran.
    pub fn finish_pass(&mut self) -> Option<PassRequest> {
        if self.requested {
            // Stay in-progress: the trailing pass starts right away and
            // later notifications must keep deferring.
            self.requested = false;
            self.pending = None;
            Some(PassRequest { changed: None })
        } else {
            self.in_progress = false;
            None
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }
}
