// src/cancel/state.rs

//! Pure cancellation state machine.
//!
//! No tokio, no signals, no processes: just the fixed transition table the
//! controller consults before doing anything. A `None` from
//! [`CancelState::on`] means the event is not allowed in that state and
//! must be ignored, which is what makes a second interrupt harmless.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Idle,
    Running,
    CancelRequested,
    TearingDown,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelEvent {
    /// The guarded pipeline is about to start.
    Start,
    /// An interrupt signal (or an explicit cancel request) arrived.
    Interrupt,
    /// The controller starts terminating stages.
    BeginTeardown,
    /// Either the pipeline completed or teardown finished.
    Finish,
}

impl CancelState {
    pub fn on(self, event: CancelEvent) -> Option<CancelState> {
        use CancelEvent::*;
        use CancelState::*;

        match (self, event) {
            (Idle, Start) => Some(Running),
            // Interrupt before anything ran: teardown is just artifact cleanup.
            (Idle, Interrupt) => Some(CancelRequested),
            (Running, Interrupt) => Some(CancelRequested),
            (Running, Finish) => Some(Done),
            (CancelRequested, BeginTeardown) => Some(TearingDown),
            (TearingDown, Finish) => Some(Done),
            _ => None,
        }
    }

    pub fn is_cancelling(self) -> bool {
        matches!(self, CancelState::CancelRequested | CancelState::TearingDown)
    }
}

impl fmt::Display for CancelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelState::Idle => "idle",
            CancelState::Running => "running",
            CancelState::CancelRequested => "cancel-requested",
            CancelState::TearingDown => "tearing-down",
            CancelState::Done => "done",
        };
        f.write_str(s)
    }
}
