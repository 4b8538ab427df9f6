// src/stage/status.rs

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
}

impl StageStatus {
    pub fn success(self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }

    /// Shell-style code: the exit code, or `128 + signal`.
    pub fn code(self) -> i32 {
        match self {
            StageStatus::Exited(code) => code,
            StageStatus::Signaled(sig) => 128 + sig,
        }
    }

    /// True when the stage died writing into a pipe nobody reads anymore.
    pub fn is_broken_pipe(self) -> bool {
        self == StageStatus::Signaled(Signal::SIGPIPE as i32)
    }
}

impl From<ExitStatus> for StageStatus {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => StageStatus::Exited(code),
            (None, Some(sig)) => StageStatus::Signaled(sig),
            // Stopped / continued states are never reported by `wait`.
            (None, None) => StageStatus::Exited(-1),
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Exited(code) => write!(f, "exit code {code}"),
            StageStatus::Signaled(sig) => match Signal::try_from(*sig) {
                Ok(signal) => write!(f, "killed by {signal}"),
                Err(_) => write!(f, "killed by signal {sig}"),
            },
        }
    }
}
