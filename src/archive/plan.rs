// src/archive/plan.rs

//! Building the stage lists for each archive operation.
//!
//! Planning is pure: it only assembles [`StageSpec`]s. Scratch resources
//! such as the FIFO are created by the caller and passed in by path, which
//! also lets `--dry-run` print a plan without touching the filesystem.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::backend::ArchiveBackend;
use crate::config::model::{ArchiveSection, ProgressSection};
use crate::errors::{PackpipeError, Result};
use crate::pipeline::PipelineSpec;
use crate::stage::{StageSpec, StdinSource, StdoutSink};
use crate::types::Engine;

/// File name of the FIFO inside the run's scratch directory.
pub const FIFO_NAME: &str = "stream.fifo";

/// `tar` packing `source` (file or directory) to stdout.
///
/// The archive stores `source` under its own name, relative to its parent.
pub fn tar_create_stage(source: &Path, archive: &ArchiveSection) -> Result<StageSpec> {
    let name = source.file_name().ok_or_else(|| {
        PackpipeError::InvalidPipeline(format!("cannot archive {:?}: no file name", source))
    })?;
    let parent = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    Ok(tar_base(archive)
        .arg("-C")
        .arg(parent)
        .args(["-c", "-f", "-"])
        .arg(name)
        .stdin(StdinSource::Inherit)
        .stdout(StdoutSink::Pipe))
}

/// `tar` unpacking a stream from stdin into `dest`.
pub fn tar_extract_stage(dest: &Path, archive: &ArchiveSection) -> StageSpec {
    tar_base(archive)
        .arg("-C")
        .arg(dest)
        .args(["-x", "-f", "-"])
        .stdin(StdinSource::Pipe)
        .stdout(StdoutSink::Inherit)
}

fn tar_base(archive: &ArchiveSection) -> StageSpec {
    let mut spec = StageSpec::new(Engine::Tar, "tar");
    if archive.preserve_acls {
        spec = spec.arg("--acls");
    }
    if archive.preserve_xattrs {
        spec = spec.arg("--xattrs");
    }
    spec
}

/// `pv` metering a pipe. `total` is the expected byte count, if known.
pub fn meter_stage(name: &str, total: Option<u64>, progress: &ProgressSection) -> StageSpec {
    let mut spec = StageSpec::new(Engine::Pv, "pv");
    if let Some(bytes) = total {
        spec = spec.arg("-s").arg(bytes.to_string());
    }
    spec = spec.arg("-N").arg(name);
    if progress.si_units {
        spec = spec.arg("-k");
    }
    if progress.quiet {
        spec = spec.arg("-q");
    } else {
        // Stages run in their own process group, which pv treats as
        // "in the background" and would otherwise stay silent.
        spec = spec.arg("-f");
    }
    spec.stdin(StdinSource::Pipe).stdout(StdoutSink::Pipe)
}

/// Inputs of a `create` run.
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub source: &'a Path,
    pub dest: &'a Path,
    /// Bytes below `source`, used as the meter total.
    pub total_bytes: u64,
    pub archive: &'a ArchiveSection,
    pub progress: &'a ProgressSection,
}

#[derive(Debug, Clone)]
pub enum CreatePlan {
    /// `tar | [pv |] compress`, one supervisor run.
    Direct(PipelineSpec),
    /// `tar | pv > fifo` with `compress < fifo` in the background.
    TwoPhase {
        fifo: PathBuf,
        pack: StageSpec,
        meter: StageSpec,
        compress: StageSpec,
    },
}

impl CreatePlan {
    pub fn is_two_phase(&self) -> bool {
        matches!(self, CreatePlan::TwoPhase { .. })
    }

    pub fn fifo(&self) -> Option<&Path> {
        match self {
            CreatePlan::TwoPhase { fifo, .. } => Some(fifo),
            CreatePlan::Direct(_) => None,
        }
    }
}

impl fmt::Display for CreatePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatePlan::Direct(spec) => write!(f, "{}", render(spec.stages())),
            CreatePlan::TwoPhase {
                fifo,
                pack,
                meter,
                compress,
            } => {
                writeln!(f, "mkfifo {}", fifo.display())?;
                writeln!(f, "{} &", compress)?;
                write!(f, "{} | {}", pack, meter)
            }
        }
    }
}

/// Render stages joined by `|`, the way a shell would show them.
pub fn render(stages: &[StageSpec]) -> String {
    stages
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Plan a `create` run.
///
/// The two-phase form is used when progress and `two_phase` are both on
/// and a FIFO location (`fifo_dir`) is available.
pub fn plan_create(
    req: &CreateRequest<'_>,
    backend: &dyn ArchiveBackend,
    fifo_dir: Option<&Path>,
) -> Result<CreatePlan> {
    let pack = tar_create_stage(req.source, req.archive)?;
    let compress = backend.create_stage(req.dest);

    if !req.progress.enabled {
        return Ok(CreatePlan::Direct(PipelineSpec::new(vec![pack, compress])?));
    }

    let meter = meter_stage("packing", Some(req.total_bytes), req.progress);

    match fifo_dir {
        Some(dir) if req.progress.two_phase => {
            let fifo = dir.join(FIFO_NAME);
            Ok(CreatePlan::TwoPhase {
                meter: meter.stdout(StdoutSink::Fifo(fifo.clone())),
                compress: compress.stdin(StdinSource::Fifo(fifo.clone())),
                fifo,
                pack,
            })
        }
        _ => Ok(CreatePlan::Direct(PipelineSpec::new(vec![
            pack, meter, compress,
        ])?)),
    }
}

/// Plan `decompress | [pv |] tar -x` into `dest`.
pub fn plan_extract(
    archive_path: &Path,
    dest: &Path,
    backend: &dyn ArchiveBackend,
    archive: &ArchiveSection,
    progress: &ProgressSection,
) -> Result<PipelineSpec> {
    let mut stages = vec![backend.extract_stage(archive_path)];
    if progress.enabled {
        // The unpacked size is unknown up front; pv shows bytes and rate.
        stages.push(meter_stage("unpacking", None, progress));
    }
    stages.push(tar_extract_stage(dest, archive));
    PipelineSpec::new(stages)
}

/// Single-stage plan for `list`.
pub fn plan_list(archive_path: &Path, backend: &dyn ArchiveBackend) -> Result<PipelineSpec> {
    PipelineSpec::new(vec![backend.list_stage(archive_path)])
}

/// Single-stage plan for `test`.
pub fn plan_test(archive_path: &Path, backend: &dyn ArchiveBackend) -> Result<PipelineSpec> {
    PipelineSpec::new(vec![backend.test_stage(archive_path)])
}

/// `<source>.tar.<ext>` next to the source.
pub fn default_destination(source: &Path, backend: &dyn ArchiveBackend) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        PackpipeError::InvalidPipeline(format!("cannot derive archive name from {:?}", source))
    })?;
    let mut file_name = name.to_os_string();
    file_name.push(format!(".tar.{}", backend.extension()));
    Ok(source.with_file_name(file_name))
}
