// src/pipeline/two_phase.rs

//! Two-phase progress pipeline for archive creation.
//!
//! ```text
//!  phase 1 (foreground):  pack | meter  >  FIFO
//!  background:                             FIFO  >  compress  > archive
//!  phase 2:               spinner until compress exits
//! ```
//!
//! Compressors buffer a lot internally and keep writing well after their
//! stdin hit EOF. The meter only sees the streamable part, so once phase 1
//! is done a spinner keeps the operator informed until the compressor
//! exits. The report is merged as `(pack, meter, compress)`.

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::errors::{PackpipeError, Result};
use crate::pipeline::report::{ExitReport, ReportEntry};
use crate::pipeline::spec::PipelineSpec;
use crate::pipeline::supervisor::{resolve_stdout, Endpoints, PipelineSupervisor};
use crate::progress::FlushSpinner;
use crate::stage::{fifo, StageHandle, StageSpec, StdinSource, StdoutSink};

/// Default liveness poll interval during phase 2.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(120);

/// Options for [`TwoPhasePipeline`].
#[derive(Debug, Clone)]
pub struct TwoPhaseOptions {
    pub poll_interval: Duration,
    /// Render the phase-2 spinner.
    pub spinner: bool,
    pub spinner_message: String,
}

impl Default for TwoPhaseOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            spinner: true,
            spinner_message: "finishing compression".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct TwoPhasePipeline<'a> {
    supervisor: &'a PipelineSupervisor,
    options: TwoPhaseOptions,
}

impl<'a> TwoPhasePipeline<'a> {
    pub fn new(supervisor: &'a PipelineSupervisor, options: TwoPhaseOptions) -> Self {
        Self {
            supervisor,
            options,
        }
    }

    /// Run `pack | meter > fifo` in the foreground while `compress < fifo`
    /// runs in the background.
    ///
    /// `meter` must write into `StdoutSink::Fifo(p)` and `compress` must
    /// read from `StdinSource::Fifo(p)` for the same, already created `p`.
    pub async fn run(
        &self,
        pack: &StageSpec,
        meter: &StageSpec,
        compress: &StageSpec,
    ) -> Result<ExitReport> {
        let fifo_path = shared_fifo(meter, compress)?;
        let phase1 = PipelineSpec::new(vec![pack.clone(), meter.clone()])?;
        let compress_stdout = resolve_stdout(compress.stdout_sink())?;

        // Open both ends up front: the writer can only be opened while a
        // reader exists, and the reader must not be handed over before a
        // writer exists or the compressor would read an immediate EOF.
        let reader = fifo::open_reader(fifo_path)?;
        let writer = fifo::open_writer(fifo_path)?;

        let mut background = self
            .supervisor
            .runner()
            .start(compress, reader.into(), compress_stdout)?;
        debug!(pid = background.pid(), fifo = %fifo_path.display(), "background compressor started");

        let foreground = match self
            .supervisor
            .start(&phase1, Endpoints::with_tail(writer))
            .await
        {
            Ok(running) => running,
            Err(err) => {
                warn!(error = %err, "phase 1 failed to start; killing background compressor");
                reap_background(&mut background).await;
                return Err(err);
            }
        };

        // Phase 1: metered transfer into the FIFO.
        let phase1_report = match foreground.wait_all().await {
            Ok(report) => report,
            Err(err) => {
                reap_background(&mut background).await;
                return Err(err);
            }
        };
        info!(codes = ?phase1_report.codes(), "phase 1 finished");

        // Phase 2: wait for the compressor to flush.
        let compress_entry = self.flush_phase(&mut background).await?;

        Ok(phase1_report.merge(ExitReport::new(vec![compress_entry])))
    }

    async fn flush_phase(&self, background: &mut StageHandle) -> Result<ReportEntry> {
        let spinner = FlushSpinner::new(self.options.spinner_message.clone(), self.options.spinner);

        loop {
            match background.is_alive() {
                Ok(true) => {
                    spinner.tick();
                    sleep(self.options.poll_interval).await;
                }
                Ok(false) => break,
                Err(err) => {
                    warn!(error = %err, "polling background compressor failed; waiting instead");
                    break;
                }
            }
        }

        let status = background.wait().await?;
        spinner.finish(format!("{} ({status})", self.options.spinner_message));
        let elapsed_ms = u64::try_from(spinner.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(elapsed_ms, "phase 2 finished");

        Ok(ReportEntry::new(
            background.engine(),
            background.program(),
            background.pid(),
            status,
        ))
    }
}

async fn reap_background(background: &mut StageHandle) {
    if let Err(err) = background.kill_and_reap().await {
        warn!(pid = background.pid(), error = %err, "failed to reap background compressor");
    }
}

fn shared_fifo<'s>(meter: &'s StageSpec, compress: &StageSpec) -> Result<&'s Path> {
    let StdoutSink::Fifo(out) = meter.stdout_sink() else {
        return Err(PackpipeError::InvalidPipeline(format!(
            "meter stage '{}' must write into a FIFO",
            meter.engine()
        )));
    };
    let StdinSource::Fifo(input) = compress.stdin_source() else {
        return Err(PackpipeError::InvalidPipeline(format!(
            "compress stage '{}' must read from a FIFO",
            compress.engine()
        )));
    };
    if out != input {
        return Err(PackpipeError::InvalidPipeline(format!(
            "meter writes {} but compressor reads {}",
            out.display(),
            input.display()
        )));
    }
    Ok(out)
}
