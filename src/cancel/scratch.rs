// src/cancel/scratch.rs

//! Temporary filesystem objects scoped to one pipeline invocation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::{PackpipeError, Result};

/// A filesystem object that must not outlive the run that created it.
#[derive(Debug)]
pub enum ScratchArtifact {
    /// Scratch directory (removed recursively).
    Dir(TempDir),
    /// Named pipe.
    Fifo(PathBuf),
    /// Output being written by the pipeline; removed unless the run
    /// succeeded and the caller kept it.
    PartialOutput(PathBuf),
}

impl ScratchArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ScratchArtifact::Dir(dir) => dir.path(),
            ScratchArtifact::Fifo(path) | ScratchArtifact::PartialOutput(path) => path,
        }
    }

    /// Remove the artifact. Already-missing paths are not an error.
    pub fn remove(self) -> io::Result<()> {
        let result = match self {
            ScratchArtifact::Dir(dir) => dir.close(),
            ScratchArtifact::Fifo(path) | ScratchArtifact::PartialOutput(path) => {
                fs::remove_file(path)
            }
        };

        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Create a fresh private scratch directory under the system temp dir.
pub fn create_scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("packpipe-")
        .tempdir()
        .map_err(|e| {
            PackpipeError::resource(std::env::temp_dir(), format!("creating scratch directory: {e}"))
        })
}
