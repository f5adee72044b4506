//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies the supervisor's operational log
//! surface: worker lifecycle (spawned/reaped and their failure twins),
//! admission decisions, and the two shutdown paths. The [`Event`] struct
//! carries metadata such as timestamps, worker pids, and the live count.
//!
//! Events are observability only. Nothing in the control loop reads them
//! back; publishing can never fail into control flow.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, restoring exact order if delivery interleaves.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker process was created.
    ///
    /// Sets:
    /// - `pid`: worker process id
    /// - `workers`: live count after the spawn
    /// - `reason`: worker program path
    WorkerSpawned,

    /// Process creation failed; the pool count is unchanged and the loop
    /// paused for the courtesy backoff.
    ///
    /// Sets:
    /// - `reason`: the OS error
    SpawnFailed,

    /// A finished worker was collected.
    ///
    /// Sets:
    /// - `pid`: worker process id (when the wait reported one)
    /// - `workers`: live count after the reap
    WorkerReaped,

    /// A wait for a finished worker failed; treated as "no reap happened".
    ///
    /// Sets:
    /// - `reason`: the OS error
    ReapFailed,

    // === Admission ===
    /// Outcome of one gate poll. Published only when debug logging is on.
    ///
    /// Sets:
    /// - `reason`: decision label (`none` / `spawn` / `shutdown-idle`)
    /// - `workers`: live count at poll time
    PollDecision,

    // === Shutdown ===
    /// A termination or hangup signal was observed.
    ShutdownRequested,

    /// The whole process group was signalled on the way out.
    ProcessGroupSignaled,

    /// Signalling the process group on the way out failed; the loop still
    /// exits, workers may outlive it.
    ///
    /// Sets:
    /// - `reason`: the OS error
    SignalFailed,

    /// The pool sat idle past the configured window; graceful exit with no
    /// workers to notify.
    IdleShutdown,
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker process id, if applicable.
    pub pid: Option<u32>,
    /// Live worker count after the operation, if applicable.
    pub workers: Option<usize>,
    /// Human-readable detail (errors, program path, decision label).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            workers: None,
            reason: None,
        }
    }

    /// Attaches a worker process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches the live worker count.
    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::WorkerSpawned);
        let b = Event::new(EventKind::WorkerReaped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::WorkerSpawned)
            .with_pid(42)
            .with_workers(3)
            .with_reason("/bin/true");
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.workers, Some(3));
        assert_eq!(ev.reason.as_deref(), Some("/bin/true"));
    }
}
