// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::cancel::CancelOptions;
use crate::types::CompressorKind;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [archive]
/// engine = "7z"
/// level = 9
/// dictionary = "64m"
///
/// [progress]
/// two_phase = true
///
/// [cancel]
/// grace_period_ms = 200
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub archive: ArchiveSection,

    #[serde(default)]
    pub progress: ProgressSection,

    #[serde(default)]
    pub cancel: CancelSection,

    #[serde(default)]
    pub output: OutputSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub archive: ArchiveSection,
    pub progress: ProgressSection,
    pub cancel: CancelSection,
    pub output: OutputSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            archive: raw.archive,
            progress: raw.progress,
            cancel: raw.cancel,
            output: raw.output,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[archive]` section: which engine and how hard it works.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSection {
    #[serde(default)]
    pub engine: CompressorKind,

    /// Compression level, 0 (store) to 9 (ultra).
    #[serde(default = "default_level")]
    pub level: u32,

    /// Worker threads; 0 lets the engine decide.
    #[serde(default)]
    pub threads: u32,

    /// Dictionary size such as `"64m"`; 7z only.
    #[serde(default)]
    pub dictionary: Option<String>,

    #[serde(default = "default_true")]
    pub preserve_acls: bool,

    #[serde(default = "default_true")]
    pub preserve_xattrs: bool,
}

fn default_level() -> u32 {
    9
}

fn default_true() -> bool {
    true
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            engine: CompressorKind::default(),
            level: default_level(),
            threads: 0,
            dictionary: None,
            preserve_acls: true,
            preserve_xattrs: true,
        }
    }
}

/// `[progress]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSection {
    /// Insert a `pv` meter stage.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Use the FIFO + spinner pipeline when creating archives.
    #[serde(default = "default_true")]
    pub two_phase: bool,

    /// Powers of 1000 instead of 1024 in the meter.
    #[serde(default)]
    pub si_units: bool,

    #[serde(default)]
    pub quiet: bool,

    #[serde(default = "default_spinner_interval_ms")]
    pub spinner_interval_ms: u64,
}

fn default_spinner_interval_ms() -> u64 {
    120
}

impl ProgressSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.spinner_interval_ms)
    }
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            enabled: true,
            two_phase: true,
            si_units: false,
            quiet: false,
            spinner_interval_ms: default_spinner_interval_ms(),
        }
    }
}

/// `[cancel]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSection {
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    #[serde(default = "default_reap_timeout_ms")]
    pub reap_timeout_ms: u64,
}

fn default_grace_period_ms() -> u64 {
    200
}

fn default_reap_timeout_ms() -> u64 {
    2000
}

impl CancelSection {
    pub fn options(&self) -> CancelOptions {
        CancelOptions {
            grace_period: Duration::from_millis(self.grace_period_ms),
            reap_timeout: Duration::from_millis(self.reap_timeout_ms),
        }
    }
}

impl Default for CancelSection {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            reap_timeout_ms: default_reap_timeout_ms(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputSection {
    /// Delete the source after a fully successful `create`.
    #[serde(default)]
    pub remove_source: bool,
}
