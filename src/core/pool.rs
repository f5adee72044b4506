//! # WorkerPool: live-count tracking, spawning, and reaping.
//!
//! The pool is deliberately a bare counter plus OS-level wait calls. No
//! per-worker identity is retained beyond what one reap needs: any finished
//! child satisfies a reap, and the loop's failure semantics depend on that
//! (a worker that died exec-failing is collected the same way as one that
//! served a million connections).
//!
//! ## Rules
//! - `spawn` never blocks the supervisor on the child's startup; a creation
//!   failure is logged, backed off for one second, and leaves the count
//!   untouched.
//! - `reap_blocking` parks until *some* worker exits (woken by the SIGCHLD
//!   stream) and is interruptible by shutdown.
//! - `reap_all` drains every already-finished worker without blocking;
//!   routine zombie cleanup on every loop iteration.

use std::io;
use std::time::Duration;

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::fd::GuardedFd;
use crate::core::worker::WorkerCommand;
use crate::events::{Bus, Event, EventKind};

/// Courtesy pause after a failed process creation.
const SPAWN_FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Bounded pool of autonomous worker processes.
///
/// Owned exclusively by the supervisor loop. The SIGCHLD stream doubles as
/// the "no-op child handler": it exists to bounce blocking waits awake when
/// workers die, not for correctness of the counts.
pub struct WorkerPool {
    count: usize,
    command: WorkerCommand,
    sigchld: Signal,
    bus: Bus,
}

impl WorkerPool {
    /// Builds an empty pool and registers the SIGCHLD listener.
    pub fn new(cfg: &Config, fd: GuardedFd, bus: Bus) -> io::Result<Self> {
        Ok(Self {
            count: 0,
            command: WorkerCommand::new(cfg, fd),
            sigchld: signal(SignalKind::child())?,
            bus,
        })
    }

    /// Live worker count.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Creates exactly one worker, or zero on failure.
    ///
    /// Process-creation failure is recoverable: it is published, the pool
    /// pauses for one second, and the count is left unchanged.
    pub async fn spawn(&mut self) {
        match self.command.spawn() {
            Ok(pid) => {
                self.count += 1;
                self.bus.publish(
                    Event::new(EventKind::WorkerSpawned)
                        .with_pid(pid)
                        .with_workers(self.count)
                        .with_reason(self.command.program().display().to_string()),
                );
            }
            Err(err) => {
                self.bus
                    .publish(Event::new(EventKind::SpawnFailed).with_reason(err.to_string()));
                tokio::time::sleep(SPAWN_FAILURE_BACKOFF).await;
            }
        }
    }

    /// Waits until any worker terminates and collects it.
    ///
    /// Returns `true` when a worker was reaped. A wait error is published
    /// and treated as "no reap happened" (the loop retries next iteration);
    /// shutdown cancellation also returns `false`.
    pub async fn reap_blocking(&mut self, shutdown: &CancellationToken) -> bool {
        loop {
            match self.try_reap_one() {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    self.bus
                        .publish(Event::new(EventKind::ReapFailed).with_reason(err.to_string()));
                    return false;
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => return false,
                _ = self.sigchld.recv() => {}
            }
        }
    }

    /// Drains all currently-terminated workers without blocking.
    pub fn reap_all(&mut self) {
        while matches!(self.try_reap_one(), Ok(true)) {}
    }

    /// Collects at most one finished worker.
    ///
    /// `Ok(true)` on a reap, `Ok(false)` when every worker is still alive.
    fn try_reap_one(&mut self) -> Result<bool, nix::errno::Errno> {
        // Pid -1: reap any finished child, whichever it is.
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::StillAlive => Ok(false),
            status => {
                self.count = self.count.saturating_sub(1);
                let mut ev = Event::new(EventKind::WorkerReaped).with_workers(self.count);
                if let Some(pid) = status.pid() {
                    ev = ev.with_pid(pid.as_raw() as u32);
                }
                self.bus.publish(ev);
                Ok(true)
            }
        }
    }
}

// Reap behavior is covered in tests/worker_pool.rs: reaping uses
// waitpid(-1), which would race against any other test in the same process
// that forks, so those tests run in their own test binary.
#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;
    use std::path::PathBuf;

    fn guarded() -> GuardedFd {
        let (a, b) = UnixStream::pair().expect("socketpair");
        // Leak the peer so the descriptor stays connected for the test.
        std::mem::forget(b);
        GuardedFd::new(OwnedFd::from(a))
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_failure_leaves_count_unchanged() {
        let cfg = Config {
            worker_program: PathBuf::from("/nonexistent/definitely-not-a-program"),
            ..Config::default()
        };
        let mut pool = WorkerPool::new(&cfg, guarded(), Bus::new(16)).expect("pool");

        // Two consecutive failures: count stays at zero, no crash.
        pool.spawn().await;
        pool.spawn().await;
        assert_eq!(pool.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_failure_publishes_event() {
        let cfg = Config {
            worker_program: PathBuf::from("/nonexistent/definitely-not-a-program"),
            ..Config::default()
        };
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let mut pool = WorkerPool::new(&cfg, guarded(), bus).expect("pool");

        pool.spawn().await;
        let ev = rx.try_recv().expect("spawn failure event");
        assert_eq!(ev.kind, EventKind::SpawnFailed);
        assert!(ev.reason.is_some());
    }
}
