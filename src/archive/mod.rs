// src/archive/mod.rs

//! Archive operations on top of the pipeline machinery.
//!
//! - [`backend`]: 7z / xz as [`ArchiveBackend`] implementations.
//! - [`plan`]: assembles the stage lists (tar, pv, compressor).
//! - [`ops`]: `create`, `extract`, `list` and `test`.

pub mod backend;
pub mod ops;
pub mod plan;

pub use backend::{backend_for, backend_for_archive, ArchiveBackend, SevenZipBackend, XzBackend};
pub use ops::{create_archive, extract_archive, list_archive, test_archive, CreateSummary, OpContext};
pub use plan::{plan_create, plan_extract, CreatePlan, CreateRequest};
