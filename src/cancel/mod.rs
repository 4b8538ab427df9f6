// src/cancel/mod.rs

//! Cancellation of a running pipeline.
//!
//! The pure state machine lives in [`state`]; [`controller`] is the async
//! shell that terminates stages and removes [`scratch`] artifacts, and
//! [`signals`] forwards OS signals into it.

pub mod controller;
pub mod scratch;
pub mod signals;
pub mod state;

pub use controller::{CancelHandle, CancelOptions, CancellationController};
pub use scratch::ScratchArtifact;
pub use signals::{install_signal_handlers, SignalGuard};
pub use state::{CancelEvent, CancelState};
