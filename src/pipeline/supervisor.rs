// src/pipeline/supervisor.rs

//! Running a whole pipeline of stage processes.

use std::fs::File;
use std::process::Stdio;

use tracing::{debug, info, warn};

use crate::errors::{PackpipeError, Result};
use crate::pipeline::report::{ExitReport, ReportEntry};
use crate::pipeline::spec::PipelineSpec;
use crate::stage::{fifo, StageHandle, StageRunner, StdinSource, StdoutSink};

/// Pre-opened endpoints overriding what the first stage's `StdinSource`
/// and the last stage's `StdoutSink` would resolve to.
#[derive(Debug, Default)]
pub struct Endpoints {
    pub head: Option<Stdio>,
    pub tail: Option<Stdio>,
}

impl Endpoints {
    pub fn with_tail(tail: impl Into<Stdio>) -> Self {
        Self {
            head: None,
            tail: Some(tail.into()),
        }
    }
}

/// Composes stage runners into one data-flow pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineSupervisor {
    runner: StageRunner,
}

impl PipelineSupervisor {
    pub fn new(runner: StageRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }

    /// Run `spec` to completion.
    ///
    /// Returns only after every stage has been reaped. A spawn failure kills
    /// and reaps the stages already started and is returned as an error.
    pub async fn run(&self, spec: &PipelineSpec) -> Result<ExitReport> {
        self.start(spec, Endpoints::default()).await?.wait_all().await
    }

    /// Start every stage of `spec` and return without waiting.
    ///
    /// The head and tail endpoints are opened before the first spawn, so a
    /// missing input file or an unwritable destination fails before any
    /// process exists.
    pub async fn start(&self, spec: &PipelineSpec, endpoints: Endpoints) -> Result<RunningPipeline> {
        let stages = spec.stages();

        let head = match endpoints.head {
            Some(stdio) => stdio,
            None => resolve_stdin(stages[0].stdin_source())?,
        };
        let tail = match endpoints.tail {
            Some(stdio) => stdio,
            None => resolve_stdout(stages[stages.len() - 1].stdout_sink())?,
        };

        let mut handles = Vec::with_capacity(stages.len());
        if let Err(err) = self.spawn_all(spec, head, tail, &mut handles) {
            warn!(error = %err, started = handles.len(), "pipeline setup failed; killing started stages");
            abort_started(&mut handles).await;
            return Err(err);
        }

        info!(stages = handles.len(), "pipeline started");
        Ok(RunningPipeline { stages: handles })
    }

    /// Spawn stages in definition order.
    ///
    /// Each stage's stdout pipe is taken out of its handle and moved into the
    /// next stage's `Command`; once that stage is spawned the supervisor no
    /// longer holds either end, so EOF propagates when the producer exits.
    fn spawn_all(
        &self,
        spec: &PipelineSpec,
        head: Stdio,
        tail: Stdio,
        handles: &mut Vec<StageHandle>,
    ) -> Result<()> {
        let stages = spec.stages();
        let last = stages.len() - 1;
        let mut next_stdin = Some(head);
        let mut tail = Some(tail);

        for (idx, stage) in stages.iter().enumerate() {
            let stdin = next_stdin.take().unwrap_or_else(Stdio::null);
            let stdout = if idx == last {
                tail.take().unwrap_or_else(Stdio::null)
            } else {
                Stdio::piped()
            };

            let mut handle = self.runner.start(stage, stdin, stdout)?;
            let downstream = if idx == last { None } else { handle.take_stdout() };
            handles.push(handle);

            if idx != last {
                let pipe = downstream.ok_or_else(|| {
                    PackpipeError::InvalidPipeline(format!(
                        "stage {idx} ('{}') has no stdout pipe",
                        stage.engine()
                    ))
                })?;
                next_stdin = Some(pipe.try_into()?);
            }
        }

        Ok(())
    }
}

/// A pipeline whose stages have all been spawned.
#[derive(Debug)]
pub struct RunningPipeline {
    stages: Vec<StageHandle>,
}

impl RunningPipeline {
    pub fn pids(&self) -> Vec<u32> {
        self.stages.iter().map(StageHandle::pid).collect()
    }

    /// Wait for every stage, in definition order, and build the report.
    ///
    /// A wait error on one stage does not stop the others from being reaped;
    /// the first such error is returned once all are done.
    pub async fn wait_all(mut self) -> Result<ExitReport> {
        let mut entries = Vec::with_capacity(self.stages.len());
        let mut first_err = None;

        for handle in &mut self.stages {
            match handle.wait().await {
                Ok(status) => entries.push(ReportEntry::new(
                    handle.engine(),
                    handle.program(),
                    handle.pid(),
                    status,
                )),
                Err(err) => {
                    warn!(stage = %handle.engine(), pid = handle.pid(), error = %err, "waiting for stage failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_err {
            return Err(err);
        }

        debug!(codes = ?entries.iter().map(|e| e.status.code()).collect::<Vec<_>>(), "pipeline finished");
        Ok(ExitReport::new(entries))
    }
}

/// Kill and reap stages started before a setup failure.
pub(crate) async fn abort_started(handles: &mut [StageHandle]) {
    for handle in handles.iter_mut() {
        if let Err(err) = handle.kill_and_reap().await {
            warn!(stage = %handle.engine(), pid = handle.pid(), error = %err, "failed to reap aborted stage");
        }
    }
}

pub(crate) fn resolve_stdin(source: &StdinSource) -> Result<Stdio> {
    Ok(match source {
        StdinSource::Inherit => Stdio::inherit(),
        StdinSource::Pipe => Stdio::piped(),
        StdinSource::File(path) => {
            let file = File::open(path)
                .map_err(|e| PackpipeError::resource(path, format!("opening input: {e}")))?;
            Stdio::from(file)
        }
        StdinSource::Fifo(path) => Stdio::from(fifo::open_reader(path)?),
    })
}

pub(crate) fn resolve_stdout(sink: &StdoutSink) -> Result<Stdio> {
    Ok(match sink {
        StdoutSink::Inherit => Stdio::inherit(),
        StdoutSink::Discard => Stdio::null(),
        StdoutSink::Pipe => Stdio::piped(),
        StdoutSink::File(path) => {
            let file = File::create(path)
                .map_err(|e| PackpipeError::resource(path, format!("creating output: {e}")))?;
            Stdio::from(file)
        }
        StdoutSink::Fifo(path) => Stdio::from(fifo::open_writer(path)?),
    })
}
