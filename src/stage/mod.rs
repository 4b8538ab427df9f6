// src/stage/mod.rs

//! Single-stage building blocks.
//!
//! - [`spec`] describes a stage: engine, argv and stdio wiring.
//! - [`runner`] spawns a stage and hands back a [`StageHandle`].
//! - [`registry`] tracks spawned-but-unreaped stages for teardown.
//! - [`status`] is the per-stage exit status.
//! - [`fifo`] creates and opens named pipes without blocking.

pub mod fifo;
pub mod registry;
pub mod runner;
pub mod spec;
pub mod status;

pub use registry::ProcessRegistry;
pub use runner::{signal_group, StageHandle, StageRunner};
pub use spec::{StageSpec, StderrMode, StdinSource, StdoutSink};
pub use status::StageStatus;
