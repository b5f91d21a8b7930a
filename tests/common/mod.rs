// tests/common/mod.rs

//! Shared test doubles: a scripted compiler and a mock watch backend.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use msgwatch::compiler::{CompilationResult, CompileRequest, Compiler};
use msgwatch::fs::TrackedFs;
use msgwatch::watch::{ChangeCallback, WatchBackend, WatchHandle};

/// One scripted compile pass: which paths to read, whether to fail, and how
/// long the pass takes (virtual time).
#[derive(Debug, Clone)]
pub struct Step {
    pub reads: Vec<PathBuf>,
    pub fail: Option<String>,
    pub hold: Option<Duration>,
}

impl Step {
    pub fn ok(reads: &[&str]) -> Self {
        Self {
            reads: reads.iter().map(PathBuf::from).collect(),
            fail: None,
            hold: None,
        }
    }

    pub fn err(reads: &[&str], message: &str) -> Self {
        Self {
            reads: reads.iter().map(PathBuf::from).collect(),
            fail: Some(message.to_string()),
            hold: None,
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }
}

/// What one compile call observed.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub clean_outdir: bool,
    pub had_previous: bool,
}

/// A `Compiler` that replays a script of [`Step`]s. Once the script runs
/// out, every further pass succeeds immediately without reading anything.
#[derive(Clone, Default)]
pub struct ScriptedCompiler {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<Mutex<Vec<CallRecord>>>,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl ScriptedCompiler {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            ..Self::default()
        }
    }

    pub fn push_step(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of passes that have begun.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of passes that have run to completion (success or failure).
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for ScriptedCompiler {
    async fn compile(
        &self,
        request: &CompileRequest<'_>,
        fs: &TrackedFs,
        previous: Option<CompilationResult>,
    ) -> Result<CompilationResult> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(CallRecord {
            clean_outdir: request.clean_outdir,
            had_previous: previous.is_some(),
        });

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::ok(&[]));

        for path in &step.reads {
            // The read may fail (the backing fs usually has no such file);
            // tracking happens regardless, which is the point.
            let _ = fs.read(path);
        }

        if let Some(hold) = step.hold {
            tokio::time::sleep(hold).await;
        }

        self.finished.fetch_add(1, Ordering::SeqCst);
        match step.fail {
            Some(message) => Err(anyhow!(message)),
            None => Ok(CompilationResult::default()),
        }
    }
}

/// Shared observable state of the [`MockBackend`].
#[derive(Default)]
pub struct MockState {
    pub file_callbacks: BTreeMap<PathBuf, ChangeCallback>,
    pub dir_callbacks: BTreeMap<PathBuf, ChangeCallback>,
    /// Every successful watch creation, in order.
    pub created: Vec<PathBuf>,
    /// Every handle close, in order.
    pub closed: Vec<PathBuf>,
    /// Paths whose watch creation fails.
    pub fail_watch: BTreeSet<PathBuf>,
    /// Paths whose handle close fails (after being recorded).
    pub fail_close: BTreeSet<PathBuf>,
}

/// A `WatchBackend` whose watches are created and fired by the test.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &mut self,
        path: &Path,
        directory: bool,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_watch.contains(path) {
            return Err(anyhow!("refusing to watch {}", path.display()));
        }
        state.created.push(path.to_path_buf());
        if directory {
            state.dir_callbacks.insert(path.to_path_buf(), on_change);
        } else {
            state.file_callbacks.insert(path.to_path_buf(), on_change);
        }
        Ok(Box::new(MockHandle {
            path: path.to_path_buf(),
            directory,
            state: Arc::clone(&self.state),
        }))
    }
}

impl WatchBackend for MockBackend {
    fn watch_file(&mut self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>> {
        self.register(path, false, on_change)
    }

    fn watch_directory(
        &mut self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>> {
        self.register(path, true, on_change)
    }
}

struct MockHandle {
    path: PathBuf,
    directory: bool,
    state: Arc<Mutex<MockState>>,
}

impl WatchHandle for MockHandle {
    fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if self.directory {
            state.dir_callbacks.remove(&self.path);
        } else {
            state.file_callbacks.remove(&self.path);
        }
        state.closed.push(self.path.clone());
        if state.fail_close.contains(&self.path) {
            return Err(anyhow!("close failed for {}", self.path.display()));
        }
        Ok(())
    }
}

/// Fire the change callback of an active file watch.
pub fn fire_file(state: &Arc<Mutex<MockState>>, path: &Path) {
    let state = state.lock().unwrap();
    if let Some(on_change) = state.file_callbacks.get(path) {
        on_change(None);
    }
}

/// Fire the change callback of an active directory watch.
pub fn fire_dir(state: &Arc<Mutex<MockState>>, path: &Path, changed: Option<PathBuf>) {
    let state = state.lock().unwrap();
    if let Some(on_change) = state.dir_callbacks.get(path) {
        on_change(changed);
    }
}
