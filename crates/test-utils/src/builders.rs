#![allow(dead_code)]

use std::path::Path;

use packpipe::config::{ConfigFile, RawConfigFile};
use packpipe::stage::{StageSpec, StdinSource, StdoutSink};
use packpipe::types::{CompressorKind, Engine};

/// `sh -c <script>` labelled as `engine`, so its exit code is classified
/// with that engine's table.
pub fn sh_stage(engine: Engine, script: &str) -> StageSpec {
    StageSpec::new(engine, "sh").arg("-c").arg(script)
}

/// Interior stage: pipe in, pipe out.
pub fn piped(engine: Engine, script: &str) -> StageSpec {
    sh_stage(engine, script)
        .stdin(StdinSource::Pipe)
        .stdout(StdoutSink::Pipe)
}

/// First stage of a pipeline: inherited stdin, pipe out.
pub fn head(engine: Engine, script: &str) -> StageSpec {
    sh_stage(engine, script)
        .stdin(StdinSource::Inherit)
        .stdout(StdoutSink::Pipe)
}

/// Last stage of a pipeline: pipe in, output discarded.
pub fn tail(engine: Engine, script: &str) -> StageSpec {
    sh_stage(engine, script)
        .stdin(StdinSource::Pipe)
        .stdout(StdoutSink::Discard)
}

/// Last stage writing into `path`.
pub fn tail_to_file(engine: Engine, script: &str, path: &Path) -> StageSpec {
    sh_stage(engine, script)
        .stdin(StdinSource::Pipe)
        .stdout(StdoutSink::File(path.to_path_buf()))
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        // Tests read stderr, keep pv and the spinner out of it.
        config.progress.quiet = true;
        Self { config }
    }

    pub fn engine(mut self, engine: CompressorKind) -> Self {
        self.config.archive.engine = engine;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.config.archive.level = level;
        self
    }

    pub fn dictionary(mut self, dict: &str) -> Self {
        self.config.archive.dictionary = Some(dict.to_string());
        self
    }

    /// Plain `tar` without ACL/xattr flags, which not every tar accepts.
    pub fn portable_tar(mut self) -> Self {
        self.config.archive.preserve_acls = false;
        self.config.archive.preserve_xattrs = false;
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.config.progress.enabled = enabled;
        self
    }

    pub fn two_phase(mut self, enabled: bool) -> Self {
        self.config.progress.two_phase = enabled;
        self
    }

    pub fn spinner_interval_ms(mut self, ms: u64) -> Self {
        self.config.progress.spinner_interval_ms = ms;
        self
    }

    pub fn grace_period_ms(mut self, ms: u64) -> Self {
        self.config.cancel.grace_period_ms = ms;
        self
    }

    pub fn remove_source(mut self, val: bool) -> Self {
        self.config.output.remove_source = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
