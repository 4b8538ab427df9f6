// src/classify/mod.rs

//! Exit status classification.
//!
//! Every external engine has its own small, fixed table mapping exit codes
//! to a diagnosis ([`tables`]). [`classify`] looks a status up in the table
//! of the engine that produced it, and [`aggregate`] folds a whole
//! [`ExitReport`] into an overall [`Outcome`].
//!
//! A pipeline only succeeds when *every* stage succeeded: a failing
//! upstream stage usually leaves downstream stages with a truncated but
//! well-formed stream, so their own success says nothing.

pub mod tables;

use std::fmt;

use nix::sys::signal::Signal;

use crate::pipeline::report::ExitReport;
use crate::stage::StageStatus;
use crate::types::{Engine, Severity};

/// Human-readable verdict for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Diagnose how `engine` ended.
pub fn classify(engine: Engine, status: StageStatus) -> Diagnosis {
    match status {
        StageStatus::Exited(code) => classify_code(engine, code),
        StageStatus::Signaled(sig) if sig == Signal::SIGPIPE as i32 => Diagnosis {
            severity: Severity::Error,
            message: "Broken pipe (downstream stage closed its input)".to_string(),
        },
        StageStatus::Signaled(sig) => Diagnosis {
            severity: Severity::Error,
            message: format!("Terminated by signal {sig}"),
        },
    }
}

/// Look `code` up in the table of `engine`.
pub fn classify_code(engine: Engine, code: i32) -> Diagnosis {
    tables::table(engine)
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, severity, message)| Diagnosis {
            severity: *severity,
            message: (*message).to_string(),
        })
        .unwrap_or_else(|| Diagnosis {
            severity: Severity::Warning,
            message: format!("Unknown exit code {code}"),
        })
}

/// True when `status` is the engine's success status.
pub fn is_success(engine: Engine, status: StageStatus) -> bool {
    status == StageStatus::Exited(tables::success_code(engine))
}

/// Overall verdict for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Indices (in definition order) of the stages that did not succeed.
    Failure { failed: Vec<usize> },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Fold a report into success / failure.
pub fn aggregate(report: &ExitReport) -> Outcome {
    let failed: Vec<usize> = report
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| !is_success(entry.engine, entry.status))
        .map(|(idx, _)| idx)
        .collect();

    if failed.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failure { failed }
    }
}
