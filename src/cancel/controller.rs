// src/cancel/controller.rs

//! Cancellation controller: the IO shell around [`CancelState`].
//!
//! One controller guards one pipeline invocation. It owns:
//! - the [`ProcessRegistry`] every stage of the run registers into;
//! - the scratch artifacts created for the run;
//! - the cancel flag, flipped through a cloneable [`CancelHandle`].
//!
//! Teardown order on cancel: SIGTERM to every live process group, a fixed
//! grace period during which the pipeline keeps reaping, SIGKILL to the
//! survivors, a bounded final reap, artifact removal.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cancel::scratch::{create_scratch_dir, ScratchArtifact};
use crate::cancel::state::{CancelEvent, CancelState};
use crate::errors::{PackpipeError, Result};
use crate::stage::{fifo, signal_group, ProcessRegistry};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(200);
pub const DEFAULT_REAP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct CancelOptions {
    /// Time between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    /// Upper bound for reaping after SIGKILL.
    pub reap_timeout: Duration,
}

impl Default for CancelOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            reap_timeout: DEFAULT_REAP_TIMEOUT,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<CancelState>,
    wake: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` if the transition table allows it.
    fn transition(&self, event: CancelEvent) -> bool {
        let mut state = self.state();
        match state.on(event) {
            Some(next) => {
                let from = *state;
                debug!(%from, to = %next, ?event, "cancel state transition");
                *state = next;
                true
            }
            None => false,
        }
    }
}

/// Cloneable hook the signal layer (or a test) uses to request cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Request cancellation.
    ///
    /// Returns `true` only for the request that actually started the
    /// cancellation; repeats are ignored.
    pub fn request(&self) -> bool {
        if self.shared.transition(CancelEvent::Interrupt) {
            self.shared.wake.notify_one();
            true
        } else {
            debug!(state = %self.state(), "ignoring cancel request");
            false
        }
    }

    pub fn state(&self) -> CancelState {
        *self.shared.state()
    }
}

#[derive(Debug)]
pub struct CancellationController {
    shared: Arc<Shared>,
    registry: ProcessRegistry,
    artifacts: Mutex<Vec<ScratchArtifact>>,
    options: CancelOptions,
}

impl CancellationController {
    pub fn new(options: CancelOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CancelState::Idle),
                wake: Notify::new(),
            }),
            registry: ProcessRegistry::new(),
            artifacts: Mutex::new(Vec::new()),
            options,
        }
    }

    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Registry to hand to the [`crate::stage::StageRunner`] of this run.
    pub fn registry(&self) -> ProcessRegistry {
        self.registry.clone()
    }

    pub fn state(&self) -> CancelState {
        *self.shared.state()
    }

    fn artifacts(&self) -> MutexGuard<'_, Vec<ScratchArtifact>> {
        self.artifacts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_artifact(&self, artifact: ScratchArtifact) {
        debug!(path = %artifact.path().display(), "registered scratch artifact");
        self.artifacts().push(artifact);
    }

    /// Create and register a scratch directory; returns its path.
    pub fn create_scratch_dir(&self) -> Result<PathBuf> {
        let dir = create_scratch_dir()?;
        let path = dir.path().to_path_buf();
        self.register_artifact(ScratchArtifact::Dir(dir));
        Ok(path)
    }

    /// Create and register a FIFO at `path`.
    pub fn create_fifo(&self, path: &Path) -> Result<PathBuf> {
        fifo::create_fifo(path)?;
        self.register_artifact(ScratchArtifact::Fifo(path.to_path_buf()));
        Ok(path.to_path_buf())
    }

    /// Register the destination of a run so a failed or cancelled run
    /// leaves no partial file behind.
    pub fn register_partial_output(&self, path: &Path) {
        self.register_artifact(ScratchArtifact::PartialOutput(path.to_path_buf()));
    }

    /// Keep `path` instead of removing it at cleanup. Returns whether it was
    /// registered.
    pub fn keep_output(&self, path: &Path) -> bool {
        let mut artifacts = self.artifacts();
        let before = artifacts.len();
        artifacts.retain(|a| !matches!(a, ScratchArtifact::PartialOutput(p) if p == path));
        before != artifacts.len()
    }

    /// Paths of the artifacts currently registered.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        self.artifacts().iter().map(|a| a.path().to_path_buf()).collect()
    }

    /// Run `pipeline` under cancellation control.
    ///
    /// - Completes normally: artifacts are cleaned up and the pipeline's
    ///   own result is returned.
    /// - Cancelled (before or during the run): stages are torn down,
    ///   artifacts are removed and `PackpipeError::Cancelled` is returned.
    pub async fn run<F, T>(&self, pipeline: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.shared.transition(CancelEvent::Start) {
            if self.state() == CancelState::CancelRequested {
                info!("cancelled before the pipeline started");
                self.shared.transition(CancelEvent::BeginTeardown);
                self.finish_teardown();
                return Err(PackpipeError::Cancelled);
            }
            return Err(PackpipeError::Other(anyhow::anyhow!(
                "cancellation controller already used (state: {})",
                self.state()
            )));
        }

        tokio::pin!(pipeline);

        let completed = tokio::select! {
            biased;
            _ = self.shared.wake.notified() => None,
            result = &mut pipeline => Some(result),
        };

        match completed {
            Some(result) if self.shared.transition(CancelEvent::Finish) => {
                self.cleanup_artifacts();
                result
            }
            Some(_) => {
                // The interrupt raced with completion; the run is still
                // reported as cancelled.
                self.shared.transition(CancelEvent::BeginTeardown);
                self.signal_live(Signal::SIGKILL);
                self.finish_teardown();
                Err(PackpipeError::Cancelled)
            }
            None => {
                self.shared.transition(CancelEvent::BeginTeardown);
                self.terminate_and_drain(pipeline.as_mut()).await;
                self.finish_teardown();
                Err(PackpipeError::Cancelled)
            }
        }
    }

    /// SIGTERM, grace, SIGKILL, bounded reap. Never waits longer than
    /// `grace_period + reap_timeout`.
    async fn terminate_and_drain<F: Future>(&self, mut pipeline: Pin<&mut F>) {
        if self.registry.is_empty() {
            info!("cancelled before any stage was running");
            return;
        }

        warn!(stages = self.registry.len(), "cancelling: terminating running stages");
        self.signal_live(Signal::SIGTERM);

        // Keep polling the pipeline so stages that exit are reaped.
        if timeout(self.options.grace_period, pipeline.as_mut()).await.is_ok() {
            debug!("all stages exited within the grace period");
            return;
        }

        if !self.registry.is_empty() {
            warn!(stages = self.registry.len(), "stages still alive after grace period; killing");
            self.signal_live(Signal::SIGKILL);
        }

        if timeout(self.options.reap_timeout, pipeline.as_mut()).await.is_err() {
            warn!(
                remaining = self.registry.len(),
                "stages not reaped within the reap timeout"
            );
        }
    }

    fn signal_live(&self, signal: Signal) {
        for (pid, engine) in self.registry.live() {
            signal_group(pid, engine, signal);
        }
    }

    fn finish_teardown(&self) {
        self.cleanup_artifacts();
        self.shared.transition(CancelEvent::Finish);
        info!("teardown complete");
    }

    /// Remove every registered artifact, newest first.
    pub fn cleanup_artifacts(&self) {
        let artifacts = std::mem::take(&mut *self.artifacts());
        for artifact in artifacts.into_iter().rev() {
            let path = artifact.path().display().to_string();
            match artifact.remove() {
                Ok(()) => debug!(path = %path, "removed scratch artifact"),
                Err(e) => warn!(path = %path, error = %e, "failed to remove scratch artifact"),
            }
        }
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new(CancelOptions::default())
    }
}

impl Drop for CancellationController {
    fn drop(&mut self) {
        self.cleanup_artifacts();
    }
}
