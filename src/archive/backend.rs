// src/archive/backend.rs

//! Archive engines as pipeline stages.
//!
//! A backend only knows how to turn a request into a [`StageSpec`]; the
//! supervisor treats every engine the same way.

use std::fmt::Debug;
use std::path::Path;

use crate::config::model::ArchiveSection;
use crate::stage::{StageSpec, StdinSource, StdoutSink};
use crate::types::{CompressorKind, Engine};

/// Capabilities of an archive engine.
pub trait ArchiveBackend: Send + Sync + Debug {
    fn kind(&self) -> CompressorKind;

    /// File extension appended after `.tar`, without a dot.
    fn extension(&self) -> &'static str;

    /// Stage that reads a tar stream on stdin and writes the archive to
    /// `dest`.
    fn create_stage(&self, dest: &Path) -> StageSpec;

    /// Stage that writes the tar stream stored in `archive` to stdout.
    fn extract_stage(&self, archive: &Path) -> StageSpec;

    fn list_stage(&self, archive: &Path) -> StageSpec;

    /// Integrity check of `archive`.
    fn test_stage(&self, archive: &Path) -> StageSpec;

    fn engine(&self) -> Engine {
        self.kind().engine()
    }
}

/// `7z`: writes the archive itself, so its stdout is discarded.
#[derive(Debug, Clone)]
pub struct SevenZipBackend {
    pub level: u32,
    pub threads: u32,
    pub dictionary: Option<String>,
}

impl SevenZipBackend {
    pub fn from_config(cfg: &ArchiveSection) -> Self {
        Self {
            level: cfg.level,
            threads: cfg.threads,
            dictionary: cfg.dictionary.clone(),
        }
    }

    fn threads_arg(&self) -> String {
        if self.threads == 0 {
            "-mmt=on".to_string()
        } else {
            format!("-mmt={}", self.threads)
        }
    }
}

impl ArchiveBackend for SevenZipBackend {
    fn kind(&self) -> CompressorKind {
        CompressorKind::SevenZip
    }

    fn extension(&self) -> &'static str {
        "7z"
    }

    fn create_stage(&self, dest: &Path) -> StageSpec {
        let mut spec = StageSpec::new(Engine::SevenZip, "7z")
            .args(["a", "-si", "-t7z"])
            .arg(format!("-mx={}", self.level));
        if let Some(dict) = &self.dictionary {
            spec = spec.arg(format!("-md={dict}"));
        }
        spec.arg(self.threads_arg())
            .args(["-bso0", "-bsp0"])
            .arg(dest)
            .stdin(StdinSource::Pipe)
            .stdout(StdoutSink::Discard)
    }

    fn extract_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::SevenZip, "7z")
            .args(["x", "-so"])
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Pipe)
    }

    fn list_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::SevenZip, "7z")
            .arg("l")
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Inherit)
    }

    fn test_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::SevenZip, "7z")
            .arg("t")
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Inherit)
    }
}

/// `xz`: a pure stream filter, so the archive is its redirected stdout.
#[derive(Debug, Clone)]
pub struct XzBackend {
    pub level: u32,
    pub threads: u32,
}

impl XzBackend {
    pub fn from_config(cfg: &ArchiveSection) -> Self {
        Self {
            level: cfg.level,
            threads: cfg.threads,
        }
    }
}

impl ArchiveBackend for XzBackend {
    fn kind(&self) -> CompressorKind {
        CompressorKind::Xz
    }

    fn extension(&self) -> &'static str {
        "xz"
    }

    fn create_stage(&self, dest: &Path) -> StageSpec {
        // -T0 means one thread per core.
        StageSpec::new(Engine::Xz, "xz")
            .args(["-z", "-c"])
            .arg(format!("-{}", self.level))
            .arg(format!("-T{}", self.threads))
            .stdin(StdinSource::Pipe)
            .stdout(StdoutSink::File(dest.to_path_buf()))
    }

    fn extract_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::Xz, "xz")
            .args(["-d", "-c"])
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Pipe)
    }

    fn list_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::Xz, "xz")
            .arg("-l")
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Inherit)
    }

    fn test_stage(&self, archive: &Path) -> StageSpec {
        StageSpec::new(Engine::Xz, "xz")
            .arg("-t")
            .arg(archive)
            .stdin(StdinSource::Inherit)
            .stdout(StdoutSink::Inherit)
    }
}

/// Backend selected by `[archive].engine`.
pub fn backend_for(cfg: &ArchiveSection) -> Box<dyn ArchiveBackend> {
    match cfg.engine {
        CompressorKind::SevenZip => Box::new(SevenZipBackend::from_config(cfg)),
        CompressorKind::Xz => Box::new(XzBackend::from_config(cfg)),
    }
}

/// Guess the backend of an existing archive from its file name, falling
/// back to the configured engine.
pub fn backend_for_archive(path: &Path, cfg: &ArchiveSection) -> Box<dyn ArchiveBackend> {
    let kind = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("7z") => CompressorKind::SevenZip,
        Some(ext) if ext.eq_ignore_ascii_case("xz") || ext.eq_ignore_ascii_case("txz") => {
            CompressorKind::Xz
        }
        _ => cfg.engine,
    };
    let cfg = ArchiveSection {
        engine: kind,
        ..cfg.clone()
    };
    backend_for(&cfg)
}
