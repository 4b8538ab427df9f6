// src/stage/spec.rs

//! Immutable description of one pipeline stage.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::Engine;

/// Where a stage reads its stdin from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinSource {
    /// Inherit the supervisor's stdin.
    Inherit,
    /// Read from the previous stage's stdout.
    Pipe,
    /// Read a regular file.
    File(PathBuf),
    /// Read from a named pipe.
    Fifo(PathBuf),
}

/// Where a stage writes its stdout to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutSink {
    /// Feed the next stage's stdin.
    Pipe,
    /// Create / truncate a regular file.
    File(PathBuf),
    /// Write into a named pipe.
    Fifo(PathBuf),
    /// Drop everything (`/dev/null`).
    Discard,
    /// Inherit the supervisor's stdout.
    Inherit,
}

/// What happens to a stage's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrMode {
    /// The operator sees the tool's own diagnostics (and pv's meter).
    #[default]
    Inherit,
    Discard,
}

/// One external program taking part in a pipeline.
///
/// Built with [`StageSpec::new`] plus the consuming `stdin` / `stdout` /
/// `stderr` setters; there is no way to mutate a spec after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    engine: Engine,
    argv: Vec<OsString>,
    stdin: StdinSource,
    stdout: StdoutSink,
    stderr: StderrMode,
}

impl StageSpec {
    /// New stage running `program` with no arguments, stdin inherited and
    /// stdout inherited.
    pub fn new(engine: Engine, program: impl Into<OsString>) -> Self {
        Self {
            engine,
            argv: vec![program.into()],
            stdin: StdinSource::Inherit,
            stdout: StdoutSink::Inherit,
            stderr: StderrMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, source: StdinSource) -> Self {
        self.stdin = source;
        self
    }

    pub fn stdout(mut self, sink: StdoutSink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn program(&self) -> &OsStr {
        &self.argv[0]
    }

    /// Arguments after the program name.
    pub fn arguments(&self) -> &[OsString] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn stdin_source(&self) -> &StdinSource {
        &self.stdin
    }

    pub fn stdout_sink(&self) -> &StdoutSink {
        &self.stdout
    }

    pub fn stderr_mode(&self) -> StderrMode {
        self.stderr
    }

    /// The FIFO this stage reads from, if any.
    pub fn stdin_fifo(&self) -> Option<&Path> {
        match &self.stdin {
            StdinSource::Fifo(p) => Some(p),
            _ => None,
        }
    }

    /// The FIFO this stage writes to, if any.
    pub fn stdout_fifo(&self) -> Option<&Path> {
        match &self.stdout {
            StdoutSink::Fifo(p) => Some(p),
            _ => None,
        }
    }
}

/// Shell-like rendering used by `--dry-run` and logs.
impl fmt::Display for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self
            .argv
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        write!(f, "{}", words.join(" "))?;

        match &self.stdin {
            StdinSource::File(p) | StdinSource::Fifo(p) => write!(f, " < {}", p.display())?,
            StdinSource::Inherit | StdinSource::Pipe => {}
        }
        match &self.stdout {
            StdoutSink::File(p) | StdoutSink::Fifo(p) => write!(f, " > {}", p.display())?,
            StdoutSink::Discard => write!(f, " > /dev/null")?,
            StdoutSink::Pipe | StdoutSink::Inherit => {}
        }
        Ok(())
    }
}
