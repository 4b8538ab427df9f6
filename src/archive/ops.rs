// src/archive/ops.rs

//! The four user-facing archive operations.
//!
//! Each operation plans its stages, runs them under the
//! [`CancellationController`] and turns the [`ExitReport`] into either a
//! summary or `PackpipeError::StageFailure`.

use std::fmt;
use std::path::{Path, PathBuf};

use indicatif::{DecimalBytes, HumanBytes};
use tracing::{error, info};

use crate::archive::backend::{backend_for, backend_for_archive};
use crate::archive::plan::{
    default_destination, plan_create, plan_extract, plan_list, plan_test, CreatePlan,
    CreateRequest,
};
use crate::cancel::CancellationController;
use crate::config::model::ConfigFile;
use crate::errors::{PackpipeError, Result};
use crate::fs::{total_size, FileSystem};
use crate::pipeline::{
    ExitReport, PipelineSpec, PipelineSupervisor, TwoPhaseOptions, TwoPhasePipeline,
};
use crate::stage::StageRunner;

/// Everything an operation needs besides its own arguments.
#[derive(Debug, Clone, Copy)]
pub struct OpContext<'a> {
    pub config: &'a ConfigFile,
    pub fs: &'a dyn FileSystem,
    pub controller: &'a CancellationController,
}

impl OpContext<'_> {
    fn supervisor(&self) -> PipelineSupervisor {
        PipelineSupervisor::new(StageRunner::new(self.controller.registry()))
    }

    fn format_bytes(&self, bytes: u64) -> String {
        if self.config.progress.si_units {
            DecimalBytes(bytes).to_string()
        } else {
            HumanBytes(bytes).to_string()
        }
    }
}

/// Result of a successful `create`.
#[derive(Debug, Clone)]
pub struct CreateSummary {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub source_bytes: u64,
    pub archive_bytes: u64,
    pub source_removed: bool,
    pub report: ExitReport,
}

impl CreateSummary {
    /// Archive size relative to the source, if the source is not empty.
    pub fn ratio(&self) -> Option<f64> {
        if self.source_bytes == 0 {
            None
        } else {
            Some(self.archive_bytes as f64 / self.source_bytes as f64)
        }
    }
}

impl fmt::Display for CreateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} -> {}",
            self.source.display(),
            self.dest.display(),
            HumanBytes(self.source_bytes),
            HumanBytes(self.archive_bytes)
        )?;
        if let Some(ratio) = self.ratio() {
            write!(f, " ({:.1}%)", ratio * 100.0)?;
        }
        Ok(())
    }
}

/// Pack `source` into an archive.
///
/// `dest` defaults to `<source>.tar.<ext>`. An existing destination is never
/// overwritten, and a failed or cancelled run leaves no archive behind.
pub async fn create_archive(
    ctx: OpContext<'_>,
    source: &Path,
    dest: Option<&Path>,
) -> Result<CreateSummary> {
    let cfg = ctx.config;
    let source = normalize_source(ctx.fs, source)?;
    let backend = backend_for(&cfg.archive);

    let dest = match dest {
        Some(d) => d.to_path_buf(),
        None => default_destination(&source, backend.as_ref())?,
    };
    if ctx.fs.exists(&dest) {
        return Err(PackpipeError::resource(
            &dest,
            "destination already exists; refusing to overwrite",
        ));
    }

    let source_bytes = total_size(ctx.fs, &source)?;
    info!(
        source = %source.display(),
        dest = %dest.display(),
        bytes = source_bytes,
        engine = %backend.engine(),
        "creating archive"
    );

    let fifo_dir = if cfg.progress.enabled && cfg.progress.two_phase {
        Some(ctx.controller.create_scratch_dir()?)
    } else {
        None
    };

    let request = CreateRequest {
        source: &source,
        dest: &dest,
        total_bytes: source_bytes,
        archive: &cfg.archive,
        progress: &cfg.progress,
    };
    let plan = plan_create(&request, backend.as_ref(), fifo_dir.as_deref())?;
    if let Some(fifo) = plan.fifo() {
        ctx.controller.create_fifo(fifo)?;
    }
    ctx.controller.register_partial_output(&dest);

    let supervisor = ctx.supervisor();
    let report = ctx
        .controller
        .run(async {
            let report = match &plan {
                CreatePlan::Direct(spec) => supervisor.run(spec).await?,
                CreatePlan::TwoPhase {
                    pack,
                    meter,
                    compress,
                    ..
                } => {
                    let options = TwoPhaseOptions {
                        poll_interval: cfg.progress.poll_interval(),
                        spinner: !cfg.progress.quiet,
                        spinner_message: format!("finishing {}", backend.engine()),
                    };
                    TwoPhasePipeline::new(&supervisor, options)
                        .run(pack, meter, compress)
                        .await?
                }
            };
            if report.outcome().is_success() {
                ctx.controller.keep_output(&dest);
            }
            Ok(report)
        })
        .await?;

    check_report(&report)?;

    let archive_bytes = ctx.fs.file_len(&dest)?;
    let source_removed = if cfg.output.remove_source {
        ctx.fs.remove_all(&source)?;
        info!(source = %source.display(), "removed source");
        true
    } else {
        false
    };

    let summary = CreateSummary {
        source,
        dest,
        source_bytes,
        archive_bytes,
        source_removed,
        report,
    };
    info!(
        source_size = %ctx.format_bytes(summary.source_bytes),
        archive_size = %ctx.format_bytes(summary.archive_bytes),
        ratio = %summary.ratio().map(|r| format!("{:.1}%", r * 100.0)).unwrap_or_default(),
        "archive created"
    );
    Ok(summary)
}

/// Unpack `archive` into `dest` (created if missing).
pub async fn extract_archive(ctx: OpContext<'_>, archive: &Path, dest: &Path) -> Result<ExitReport> {
    let cfg = ctx.config;
    require_archive(ctx.fs, archive)?;

    if !ctx.fs.exists(dest) {
        ctx.fs.create_dir_all(dest).map_err(|e| {
            PackpipeError::resource(dest, format!("cannot create destination: {e:#}"))
        })?;
    } else if !ctx.fs.is_dir(dest) {
        return Err(PackpipeError::resource(dest, "destination is not a directory"));
    }

    let backend = backend_for_archive(archive, &cfg.archive);
    let spec = plan_extract(archive, dest, backend.as_ref(), &cfg.archive, &cfg.progress)?;
    info!(archive = %archive.display(), dest = %dest.display(), "extracting archive");

    let report = run_supervised(ctx, &spec).await?;
    check_report(&report)?;
    Ok(report)
}

/// Print the contents of `archive` through the engine's own listing.
pub async fn list_archive(ctx: OpContext<'_>, archive: &Path) -> Result<ExitReport> {
    require_archive(ctx.fs, archive)?;
    let backend = backend_for_archive(archive, &ctx.config.archive);
    let spec = plan_list(archive, backend.as_ref())?;

    let report = run_supervised(ctx, &spec).await?;
    check_report(&report)?;
    Ok(report)
}

/// Verify the integrity of `archive`.
pub async fn test_archive(ctx: OpContext<'_>, archive: &Path) -> Result<ExitReport> {
    require_archive(ctx.fs, archive)?;
    let backend = backend_for_archive(archive, &ctx.config.archive);
    let spec = plan_test(archive, backend.as_ref())?;

    let report = run_supervised(ctx, &spec).await?;
    check_report(&report)?;
    info!(archive = %archive.display(), "archive is intact");
    Ok(report)
}

async fn run_supervised(ctx: OpContext<'_>, spec: &PipelineSpec) -> Result<ExitReport> {
    let supervisor = ctx.supervisor();
    ctx.controller.run(supervisor.run(spec)).await
}

/// One diagnostic line per failing stage, then `StageFailure`.
fn check_report(report: &ExitReport) -> Result<()> {
    let lines = report.failure_lines();
    if lines.is_empty() {
        return Ok(());
    }
    for line in &lines {
        error!("{line}");
    }
    Err(PackpipeError::StageFailure {
        failed: lines.len(),
        total: report.len(),
    })
}

fn require_archive(fs: &dyn FileSystem, archive: &Path) -> Result<()> {
    if !fs.exists(archive) {
        return Err(PackpipeError::resource(archive, "archive does not exist"));
    }
    if fs.is_dir(archive) {
        return Err(PackpipeError::resource(archive, "archive is a directory"));
    }
    Ok(())
}

/// Make sure `source` exists and has a file name tar can store it under.
fn normalize_source(fs: &dyn FileSystem, source: &Path) -> Result<PathBuf> {
    if !fs.exists(source) {
        return Err(PackpipeError::resource(source, "source does not exist"));
    }
    if source.file_name().is_some() {
        return Ok(source.to_path_buf());
    }
    // ".", ".." and friends.
    std::fs::canonicalize(source)
        .map_err(|e| PackpipeError::resource(source, format!("cannot resolve source: {e}")))
}
