use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// External programs that may take part in a pipeline.
///
/// The set is closed: every stage is one of these engines, and the exit
/// code tables in [`crate::classify`] are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Engine {
    /// tar-format packer / unpacker.
    Tar,
    /// Progress meter.
    Pv,
    /// 7-Zip archiver.
    SevenZip,
    /// xz compressor.
    Xz,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Tar => "tar",
            Engine::Pv => "pv",
            Engine::SevenZip => "7z",
            Engine::Xz => "xz",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which compression engine backs archive operations.
///
/// - `SevenZip` (default): `.tar.7z`, supports a dictionary size option.
/// - `Xz`: `.tar.xz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum CompressorKind {
    #[default]
    #[serde(rename = "7z")]
    SevenZip,
    #[serde(rename = "xz")]
    Xz,
}

impl CompressorKind {
    pub fn engine(self) -> Engine {
        match self {
            CompressorKind::SevenZip => Engine::SevenZip,
            CompressorKind::Xz => Engine::Xz,
        }
    }
}

impl FromStr for CompressorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7z" | "7zip" | "sevenzip" => Ok(CompressorKind::SevenZip),
            "xz" => Ok(CompressorKind::Xz),
            other => Err(format!(
                "invalid engine: {other} (expected \"7z\" or \"xz\")"
            )),
        }
    }
}

/// How bad a classified exit status is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}
