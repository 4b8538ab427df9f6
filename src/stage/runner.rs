// src/stage/runner.rs

//! Launching a single stage process.

use std::os::unix::process::CommandExt;
use std::process::Stdio;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::errors::{PackpipeError, Result};
use crate::stage::registry::ProcessRegistry;
use crate::stage::spec::{StageSpec, StderrMode};
use crate::stage::status::StageStatus;
use crate::types::Engine;

/// Spawns stage processes and records them in a [`ProcessRegistry`].
#[derive(Debug, Clone, Default)]
pub struct StageRunner {
    registry: ProcessRegistry,
}

impl StageRunner {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Start `spec` with already-resolved stdio endpoints.
    ///
    /// The child is placed in its own process group so teardown can signal
    /// anything it forks as well. The endpoints are moved into the
    /// `Command`, which is dropped before returning: the parent keeps no
    /// copy of the descriptors it handed over.
    pub fn start(&self, spec: &StageSpec, stdin: Stdio, stdout: Stdio) -> Result<StageHandle> {
        let program = spec.program().to_string_lossy().into_owned();

        let child = {
            let mut cmd = std::process::Command::new(spec.program());
            cmd.args(spec.arguments())
                .stdin(stdin)
                .stdout(stdout)
                .stderr(match spec.stderr_mode() {
                    StderrMode::Inherit => Stdio::inherit(),
                    StderrMode::Discard => Stdio::null(),
                })
                .process_group(0);

            let mut cmd = Command::from(cmd);
            cmd.kill_on_drop(true);

            cmd.spawn().map_err(|source| PackpipeError::Spawn {
                engine: spec.engine(),
                program: program.clone(),
                source,
            })?
        };

        let Some(pid) = child.id() else {
            // Only possible if the child was already reaped, which we never do here.
            return Err(PackpipeError::Spawn {
                engine: spec.engine(),
                program,
                source: std::io::Error::other("spawned process has no pid"),
            });
        };

        self.registry.register(pid, spec.engine());
        info!(stage = %spec.engine(), pid, cmd = %spec, "started stage process");

        Ok(StageHandle {
            engine: spec.engine(),
            program,
            pid,
            child,
            registry: self.registry.clone(),
            status: None,
        })
    }
}

/// A started stage process.
///
/// Dropping a handle of a process that is still running kills it (only the
/// process itself, not its group); the supervisor always waits explicitly.
#[derive(Debug)]
pub struct StageHandle {
    engine: Engine,
    program: String,
    pid: u32,
    child: Child,
    registry: ProcessRegistry,
    status: Option<StageStatus>,
}

impl StageHandle {
    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Take the parent's end of a `Stdio::piped()` stdout, if there is one.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Wait for the process to exit and reap it.
    pub async fn wait(&mut self) -> Result<StageStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        let status = self.child.wait().await?;
        Ok(self.record(status.into()))
    }

    /// Non-blocking liveness poll. Reaps the process if it has exited.
    pub fn is_alive(&mut self) -> Result<bool> {
        if self.status.is_some() {
            return Ok(false);
        }

        match self.child.try_wait()? {
            Some(status) => {
                self.record(status.into());
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Best-effort signal to the stage's whole process group.
    pub fn terminate(&self, signal: Signal) {
        if self.status.is_some() {
            return;
        }
        signal_group(self.pid, self.engine, signal);
    }

    /// Kill the process group and reap the process.
    pub async fn kill_and_reap(&mut self) -> Result<StageStatus> {
        self.terminate(Signal::SIGKILL);
        self.wait().await
    }

    pub fn status(&self) -> Option<StageStatus> {
        self.status
    }

    fn record(&mut self, status: StageStatus) -> StageStatus {
        self.status = Some(status);
        self.registry.unregister(self.pid);

        info!(
            stage = %self.engine,
            pid = self.pid,
            exit_code = status.code(),
            success = status.success(),
            "stage process exited"
        );
        status
    }
}

/// Send `signal` to the process group led by `pid`.
///
/// `ESRCH` means the group is already gone, which is fine during teardown.
pub fn signal_group(pid: u32, engine: Engine, signal: Signal) {
    let Ok(raw) = i32::try_from(pid) else {
        warn!(stage = %engine, pid, "pid out of range; not signalling");
        return;
    };

    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => debug!(stage = %engine, pid, %signal, "signalled process group"),
        Err(Errno::ESRCH) => debug!(stage = %engine, pid, "process group already gone"),
        Err(e) => warn!(stage = %engine, pid, %signal, error = %e, "failed to signal process group"),
    }
}
