//! # Supervisor: the main loop over gate and pool.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and the
//! configuration. Each iteration it keeps the pool inside its band, buries
//! finished workers, and asks the [`AcceptGate`] whether pending activity
//! warrants a new worker.
//!
//! ## Per-iteration logic
//! ```text
//! loop {
//!   ├─► shutdown flag set? ──► killpg(SIGHUP), exit            (DRAINING)
//!   ├─► count ≥ max? ───────► block-reap one (interruptible)
//!   ├─► count < min? ───────► spawn, restart iteration
//!   ├─► reap_all()            (routine zombie cleanup)
//!   └─► gate.poll(fd, count)
//!         ├─ None          ─► restart iteration
//!         ├─ Spawn         ─► spawn, restart iteration
//!         └─ ShutdownIdle  ─► exit quietly (no workers to notify)
//! }
//! ```
//!
//! The loop is single-threaded and the only component with unbounded
//! lifetime; gate state and the worker count are owned here exclusively.
//! The shutdown flag is a [`CancellationToken`] set once by the signal
//! listener and read at the top of every iteration; it is the supervisor's
//! only cross-context state.
//!
//! ## Example
//! ```no_run
//! use std::os::fd::OwnedFd;
//! use std::os::unix::net::UnixStream;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use preforkd::{Config, GuardedFd, Subscriber, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         max_workers: 4,
//!         worker_program: PathBuf::from("/usr/libexec/worker"),
//!         ..Config::default()
//!     };
//!
//!     let subs: Vec<Arc<dyn Subscriber>> = Vec::new();
//!     let sup = Supervisor::new(cfg, subs)?;
//!
//!     // Normally the descriptor is inherited; see `bootstrap::swizzle_stdio`.
//!     let (sock, _peer) = UnixStream::pair()?;
//!     let fd = GuardedFd::new(OwnedFd::from(sock));
//!
//!     sup.run(fd).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgrp, getpid, setpgid, Pid};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::fd::GuardedFd;
use crate::core::gate::{AcceptGate, Decision};
use crate::core::pool::WorkerPool;
use crate::core::shutdown::ShutdownSignals;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscriber, SubscriberSet};

/// Coordinates the admission gate, the worker pool, and shutdown.
pub struct Supervisor {
    /// Immutable run configuration.
    pub cfg: Config,
    /// Event bus shared with the pool and the shutdown listener.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    pub subs: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Creates a supervisor after validating the configuration.
    ///
    /// Malformed configuration fails here, before any worker is spawned.
    pub fn new(
        cfg: Config,
        subscribers: Vec<Arc<dyn Subscriber>>,
    ) -> Result<Self, RuntimeError> {
        cfg.validate()?;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Ok(Self {
            cfg,
            bus,
            subs: Arc::new(SubscriberSet::new(subscribers)),
        })
    }

    /// Runs the supervisor over the guarded descriptor until a termination
    /// signal arrives or the idle timeout expires.
    pub async fn run(&self, fd: GuardedFd) -> Result<(), RuntimeError> {
        join_own_process_group()?;

        let shutdown = CancellationToken::new();
        self.spawn_shutdown_listener(&shutdown)?;
        self.spawn_subscriber_listener();

        let mut gate = AcceptGate::new(&self.cfg);
        let mut pool = WorkerPool::new(&self.cfg, fd.clone(), self.bus.clone())
            .map_err(|source| RuntimeError::Signals { source })?;

        self.run_loop(&mut gate, &mut pool, &fd, &shutdown).await;
        Ok(())
    }

    /// Registers the termination listeners and arms the shutdown flag.
    fn spawn_shutdown_listener(&self, shutdown: &CancellationToken) -> Result<(), RuntimeError> {
        let mut signals =
            ShutdownSignals::new().map_err(|source| RuntimeError::Signals { source })?;
        let bus = self.bus.clone();
        let token = shutdown.clone();
        tokio::spawn(async move {
            signals.recv().await;
            bus.publish(Event::new(EventKind::ShutdownRequested));
            token.cancel();
        });
        Ok(())
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev).await,
                    // Lagging only skips old events; a closed bus means the
                    // supervisor is gone.
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// The main loop. Exits on the shutdown flag (after signalling the
    /// process group) or on idle shutdown (quietly).
    async fn run_loop(
        &self,
        gate: &mut AcceptGate,
        pool: &mut WorkerPool,
        fd: &GuardedFd,
        shutdown: &CancellationToken,
    ) {
        loop {
            if shutdown.is_cancelled() {
                self.signal_process_group();
                return;
            }

            // At capacity: make room before anything else. A failed reap is
            // already logged by the pool; proceed rather than deadlock.
            if pool.count() >= self.cfg.max_workers {
                pool.reap_blocking(shutdown).await;
            }

            // Maintaining the floor takes priority over polling.
            if pool.count() < self.cfg.min_workers {
                pool.spawn().await;
                continue;
            }

            pool.reap_all();

            let decision = tokio::select! {
                // A signal during the gate's bounded waits must not stall
                // shutdown until the wait runs out.
                _ = shutdown.cancelled() => continue,
                d = gate.poll(fd, pool.count()) => d,
            };

            if self.cfg.debug {
                self.bus.publish(
                    Event::new(EventKind::PollDecision)
                        .with_reason(decision.as_label())
                        .with_workers(pool.count()),
                );
            }

            match decision {
                Decision::None => {}
                Decision::Spawn => pool.spawn().await,
                Decision::ShutdownIdle => {
                    // By construction there are zero workers to notify.
                    self.bus.publish(Event::new(EventKind::IdleShutdown));
                    return;
                }
            }
        }
    }

    /// Fans the hangup signal out to every live worker on the way out.
    ///
    /// The supervisor joined its own process group at startup, so this
    /// reaches exactly the workers (and the supervisor itself, whose
    /// listener already fired). The OS terminates the descendants; the
    /// loop does not wait for them.
    fn signal_process_group(&self) {
        self.bus
            .publish(group_signal_event(killpg(getpgrp(), Signal::SIGHUP)));
    }
}

/// Maps the outcome of the process-group signal to its event.
///
/// A failure here gets its own kind: no reap was involved, and the loop
/// exits either way, so subscribers must be able to tell that workers may
/// have outlived the supervisor.
fn group_signal_event(result: Result<(), Errno>) -> Event {
    match result {
        Ok(()) => Event::new(EventKind::ProcessGroupSignaled),
        Err(err) => {
            Event::new(EventKind::SignalFailed).with_reason(format!("killpg failed: {err}"))
        }
    }
}

/// Moves the supervisor into its own process group so the terminal signal
/// fan-out reaches exactly the supervisor and its workers.
///
/// EPERM is tolerated: a session leader cannot re-set its group, and does
/// not need to.
fn join_own_process_group() -> Result<(), RuntimeError> {
    match setpgid(Pid::from_raw(0), getpid()) {
        Ok(()) | Err(Errno::EPERM) => Ok(()),
        Err(source) => Err(RuntimeError::ProcessGroup { source }),
    }
}
