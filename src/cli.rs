// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::CompressorKind;

/// Command-line arguments for `packpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "packpipe",
    version,
    about = "Stream directories into compressed archives through tar, pv and 7z/xz.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Packpipe.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PACKPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the stage commands that would run, without running them.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Pack a file or directory into `<SOURCE>.tar.<ext>`.
    Create(CreateArgs),

    /// Unpack an archive.
    Extract {
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Directory to unpack into (created if missing).
        #[arg(short = 'C', long = "directory", value_name = "DIR", default_value = ".")]
        directory: PathBuf,
    },

    /// Show the contents of an archive.
    List {
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
    },

    /// Check the integrity of an archive.
    Test {
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct CreateArgs {
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Archive path. Default: `<SOURCE>.tar.<ext>` next to the source.
    #[arg(short = 'o', long = "output", value_name = "DEST")]
    pub output: Option<PathBuf>,

    /// Compression engine: 7z or xz.
    #[arg(long, value_name = "ENGINE")]
    pub engine: Option<CompressorKind>,

    /// Compression level 0-9.
    #[arg(long, value_name = "N")]
    pub level: Option<u32>,

    /// Compressor threads (0 = automatic).
    #[arg(long, value_name = "N")]
    pub threads: Option<u32>,

    /// Do not insert the pv meter.
    #[arg(long)]
    pub no_progress: bool,

    /// Run the compressor inline instead of behind a FIFO with a spinner.
    #[arg(long)]
    pub no_two_phase: bool,

    /// Delete the source after the archive was written successfully.
    #[arg(long)]
    pub remove_source: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
