// src/cancel/signals.rs

//! Wiring OS interrupt signals to a [`CancelHandle`].
//!
//! Default signal dispositions are not restored after the first signal.
//! tokio keeps its handler installed for the life of the process, so a
//! repeated Ctrl-C during teardown is swallowed and the process still
//! exits once, with the cancellation exit code.

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cancel::controller::CancelHandle;
use crate::errors::Result;

/// Keeps the signal listener alive; dropping it stops forwarding signals.
#[derive(Debug)]
pub struct SignalGuard {
    task: JoinHandle<()>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Forward SIGINT, SIGTERM and SIGHUP to `handle`.
///
/// Only the first signal starts a teardown; later ones hit the state
/// machine's guard and are logged and dropped.
pub fn install_signal_handlers(handle: CancelHandle) -> Result<SignalGuard> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    let task = tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = hangup.recv() => "SIGHUP",
                else => break,
            };

            if handle.request() {
                warn!(signal = name, "interrupted; tearing down pipeline");
            } else {
                debug!(signal = name, "teardown already in progress; ignoring signal");
            }
        }
    });

    Ok(SignalGuard { task })
}
