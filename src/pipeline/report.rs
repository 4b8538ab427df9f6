// src/pipeline/report.rs

use crate::classify::{self, Diagnosis, Outcome};
use crate::stage::StageStatus;
use crate::types::Engine;

/// Result of one stage within a finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub engine: Engine,
    pub program: String,
    pub pid: u32,
    pub status: StageStatus,
    pub diagnosis: Diagnosis,
}

impl ReportEntry {
    pub fn new(engine: Engine, program: impl Into<String>, pid: u32, status: StageStatus) -> Self {
        Self {
            engine,
            program: program.into(),
            pid,
            status,
            diagnosis: classify::classify(engine, status),
        }
    }

    pub fn succeeded(&self) -> bool {
        classify::is_success(self.engine, self.status)
    }
}

/// Per-stage exit statuses of one pipeline run, in definition order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitReport {
    entries: Vec<ReportEntry>,
}

impl ExitReport {
    pub fn new(entries: Vec<ReportEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn engines(&self) -> Vec<Engine> {
        self.entries.iter().map(|e| e.engine).collect()
    }

    pub fn codes(&self) -> Vec<i32> {
        self.entries.iter().map(|e| e.status.code()).collect()
    }

    /// Append the entries of a later phase, keeping conceptual stage order.
    pub fn merge(mut self, later: ExitReport) -> ExitReport {
        self.entries.extend(later.entries);
        self
    }

    pub fn outcome(&self) -> Outcome {
        classify::aggregate(self)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.succeeded())
    }

    /// One diagnostic line per failing stage.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures()
            .map(|e| {
                format!(
                    "stage '{}' ({}) failed with {}: {}",
                    e.engine, e.program, e.status, e.diagnosis.message
                )
            })
            .collect()
    }
}
