// src/pipeline/mod.rs

//! Multi-stage pipelines.
//!
//! - [`spec`]: validated stage list.
//! - [`supervisor`]: starts all stages wired through anonymous pipes and
//!   reaps them, reporting statuses in definition order.
//! - [`two_phase`]: pack/meter into a FIFO with a background compressor,
//!   then a spinner until the compressor is done.
//! - [`report`]: the per-stage [`ExitReport`].

pub mod report;
pub mod spec;
pub mod supervisor;
pub mod two_phase;

pub use report::{ExitReport, ReportEntry};
pub use spec::PipelineSpec;
pub use supervisor::{Endpoints, PipelineSupervisor, RunningPipeline};
pub use two_phase::{TwoPhaseOptions, TwoPhasePipeline};
