//! # OS signal handling for graceful shutdown.
//!
//! Exactly the signals the supervisor contract names:
//! - `SIGTERM` (default kill signal)
//! - `SIGHUP` (the signal the supervisor itself fans out to its process
//!   group on the way out)
//!
//! `SIGINT` is deliberately not handled; an interactive Ctrl-C goes to the
//! whole foreground process group anyway. `SIGCHLD` is owned by the worker
//! pool, not here.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Pre-registered termination listeners.
///
/// Registration happens in [`new`](ShutdownSignals::new) so a failure
/// surfaces as a startup error instead of disappearing inside a spawned
/// task.
pub struct ShutdownSignals {
    sigterm: Signal,
    sighup: Signal,
}

impl ShutdownSignals {
    /// Registers listeners for the termination and hangup signals.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Completes when either signal is received.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {}
            _ = self.sighup.recv() => {}
        }
    }
}
