// src/errors.rs

//! Crate-wide error type and process exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Engine;

/// Exit code used when a run was torn down by an interrupt.
pub const CANCEL_EXIT_CODE: i32 = 1;

/// Exit code used when every stage started but at least one failed.
pub const STAGE_FAILURE_EXIT_CODE: i32 = 2;

/// Exit code for setup problems (config, spawn, scratch resources).
pub const SETUP_FAILURE_EXIT_CODE: i32 = 3;

#[derive(Error, Debug)]
pub enum PackpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// The program of a stage could not be launched at all.
    #[error("failed to start stage '{engine}' ({program}): {source}")]
    Spawn {
        engine: Engine,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Scratch directory / FIFO could not be prepared.
    #[error("scratch resource error at {path:?}: {message}")]
    Resource { path: PathBuf, message: String },

    #[error("{failed} of {total} pipeline stage(s) failed")]
    StageFailure { failed: usize, total: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PackpipeError {
    pub fn resource(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PackpipeError::Resource {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit code the binary should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackpipeError::Cancelled => CANCEL_EXIT_CODE,
            PackpipeError::StageFailure { .. } => STAGE_FAILURE_EXIT_CODE,
            _ => SETUP_FAILURE_EXIT_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackpipeError>;
