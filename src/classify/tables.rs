// src/classify/tables.rs

//! Per-engine exit code tables.

use crate::types::{Engine, Severity};

/// One row of an exit code table.
pub type ExitCodeEntry = (i32, Severity, &'static str);

const TAR: &[ExitCodeEntry] = &[
    (0, Severity::Ok, "Success"),
    (
        1,
        Severity::Warning,
        "Warning (some files differ, or were changed while being archived)",
    ),
    (2, Severity::Error, "Fatal error"),
];

const PV: &[ExitCodeEntry] = &[
    (0, Severity::Ok, "Success"),
    (2, Severity::Error, "One or more files could not be accessed"),
    (4, Severity::Error, "Input file is the same as the output file"),
    (
        8,
        Severity::Error,
        "Internal error closing a file or moving to the next file",
    ),
    (
        16,
        Severity::Error,
        "Data transfer was interrupted by a signal or a transfer error",
    ),
    (32, Severity::Error, "A signal was caught that caused an early exit"),
    (64, Severity::Error, "Memory allocation failed"),
];

const SEVEN_ZIP: &[ExitCodeEntry] = &[
    (0, Severity::Ok, "No error"),
    (1, Severity::Warning, "Warning (non fatal error(s))"),
    (2, Severity::Error, "Fatal error"),
    (7, Severity::Error, "Command line error"),
    (8, Severity::Error, "Not enough memory for operation"),
    (255, Severity::Error, "User stopped the process"),
];

const XZ: &[ExitCodeEntry] = &[
    (0, Severity::Ok, "Success"),
    (1, Severity::Error, "An error occurred"),
    (
        2,
        Severity::Warning,
        "Something worth a warning occurred, but no actual errors",
    ),
];

/// The fixed exit code table of `engine`.
pub fn table(engine: Engine) -> &'static [ExitCodeEntry] {
    match engine {
        Engine::Tar => TAR,
        Engine::Pv => PV,
        Engine::SevenZip => SEVEN_ZIP,
        Engine::Xz => XZ,
    }
}

/// Exit code meaning "everything went fine" for `engine`.
///
/// Zero for every engine we drive today.
pub fn success_code(engine: Engine) -> i32 {
    match engine {
        Engine::Tar | Engine::Pv | Engine::SevenZip | Engine::Xz => 0,
    }
}
