// src/engine/session.rs

use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::compiler::Compiler;
use crate::engine::driver::CompilationDriver;
use crate::engine::scheduler::{CompileScheduler, DEBOUNCE_QUIET_PERIOD, NotifyOutcome, PassRequest};

/// Events consumed by the watch session loop.
///
/// - watch callbacks send `CompileRequested`
/// - the compile executor sends `PassFinished`
/// - the hosting application sends `ShutdownRequested` (e.g. from its
///   termination signal handler)
#[derive(Debug)]
pub enum SessionEvent {
    CompileRequested { path: PathBuf },
    PassFinished { succeeded: bool },
    ShutdownRequested,
}

/// Requests consumed by the compile executor task.
#[derive(Debug)]
pub enum ExecutorRequest {
    Run(PassRequest),
    Shutdown,
}

/// Spawn the task that owns the [`CompilationDriver`] and executes passes.
///
/// Running passes on their own task keeps the session loop free to receive
/// change notifications mid-pass, which is what makes coalescing work; the
/// session only ever has one outstanding request, so passes never overlap.
///
/// A compile failure is reported and the loop keeps going — in watch mode
/// the next file save retries automatically, and the last successful output
/// stays in place.
pub fn spawn_compile_executor<C>(
    mut driver: CompilationDriver<C>,
    mut requests_rx: mpsc::Receiver<ExecutorRequest>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) -> JoinHandle<()>
where
    C: Compiler + 'static,
{
    tokio::spawn(async move {
        while let Some(request) = requests_rx.recv().await {
            match request {
                ExecutorRequest::Run(pass) => {
                    let succeeded = match driver.run_pass(pass.changed.as_deref()).await {
                        Ok(()) => true,
                        Err(err) => {
                            error!("failed to compile message project: {err:#}");
                            info!("check the message sources for errors; still watching");
                            false
                        }
                    };
                    if events_tx
                        .send(SessionEvent::PassFinished { succeeded })
                        .is_err()
                    {
                        // Session is gone; nothing left to report to.
                        break;
                    }
                }
                ExecutorRequest::Shutdown => break,
            }
        }
        // All exit paths converge here so the watches are closed exactly
        // once, even when the session vanished mid-pass.
        driver.shutdown();
        debug!("compile executor stopped");
    })
}

/// The watch-mode control loop.
///
/// A single logical thread: it consumes [`SessionEvent`]s, drives the
/// [`CompileScheduler`], owns the debounce timer, and dispatches passes to
/// the executor task. Watch mode starts with one mandatory full pass before
/// entering the event-driven loop.
pub struct WatchSession {
    scheduler: CompileScheduler,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    requests_tx: mpsc::Sender<ExecutorRequest>,
}

impl WatchSession {
    pub fn new(
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        requests_tx: mpsc::Sender<ExecutorRequest>,
    ) -> Self {
        Self {
            scheduler: CompileScheduler::new(),
            events_rx,
            requests_tx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        // Mandatory initial full pass; the output directory starts clean.
        self.scheduler.begin_pass();
        self.requests_tx
            .send(ExecutorRequest::Run(PassRequest { changed: None }))
            .await?;

        let debounce = time::sleep(DEBOUNCE_QUIET_PERIOD);
        tokio::pin!(debounce);
        let mut debounce_armed = false;

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else {
                        debug!("session event channel closed");
                        break;
                    };
                    match event {
                        SessionEvent::CompileRequested { path } => {
                            debug!(path = %path.display(), "change notification");
                            match self.scheduler.notify(Some(path)) {
                                NotifyOutcome::Debounce => {
                                    debounce
                                        .as_mut()
                                        .reset(Instant::now() + DEBOUNCE_QUIET_PERIOD);
                                    debounce_armed = true;
                                }
                                NotifyOutcome::Deferred => {}
                            }
                        }
                        SessionEvent::PassFinished { succeeded } => {
                            debug!(succeeded, "pass finished");
                            if let Some(trailing) = self.scheduler.finish_pass() {
                                self.requests_tx
                                    .send(ExecutorRequest::Run(trailing))
                                    .await?;
                            }
                        }
                        SessionEvent::ShutdownRequested => {
                            info!("shutting down watch session");
                            let _ = self.requests_tx.send(ExecutorRequest::Shutdown).await;
                            return Ok(());
                        }
                    }
                }
                () = &mut debounce, if debounce_armed => {
                    debounce_armed = false;
                    if let Some(pass) = self.scheduler.debounce_elapsed() {
                        self.requests_tx.send(ExecutorRequest::Run(pass)).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
