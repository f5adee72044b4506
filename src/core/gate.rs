//! # AcceptGate: the adaptive admission state machine.
//!
//! Decides, once per poll, whether pending activity on the guarded
//! descriptor warrants spawning a worker, whether to keep waiting, or
//! whether the supervisor should shut down after prolonged idleness.
//!
//! ## State machine
//! ```text
//!          activity                 interval halved to < 1,
//!          seen                     or no worker alive
//!   IDLE ──────────► SAMPLING ─────────────────────────► BACKOFF
//!    ▲                  │  halve interval,                  │
//!    │    wait timed    │  schedule wakeup,                 │ postpone next
//!    │    out           │  keep sampling                    │ poll by the
//!    └──────────────────┘                                   │ rate limit
//!    ▲                                                      │
//!    └──────────────────────────────────────────────────────┘
//! ```
//!
//! Repeated readiness within a short span shrinks the sampling interval
//! geometrically, so a sustained burst converges on a spawn decision
//! quickly; BACKOFF then imposes a hard floor between spawns, bounding the
//! spawn rate under load spikes. The gate signals idle shutdown through its
//! return value; it has no terminal state of its own.

use std::time::Duration;

use crate::clock::{self, Instant};
use crate::config::Config;
use crate::core::fd::{Pollable, Readiness};

/// Readiness-wait timeout used whenever no idle deadline applies.
const READY_WAIT_DEFAULT: Duration = Duration::from_secs(60);

/// What the supervisor loop should do after one gate poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do this cycle.
    None,
    /// Spawn one worker now.
    Spawn,
    /// The pool has been idle past the configured window with no standing
    /// floor; shut down gracefully.
    ShutdownIdle,
}

impl Decision {
    /// Returns a short stable label for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Decision::None => "none",
            Decision::Spawn => "spawn",
            Decision::ShutdownIdle => "shutdown-idle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    Sampling,
    Backoff,
}

/// Adaptive admission gate over one guarded descriptor.
///
/// Owned exclusively by the supervisor loop; `wakeup_at` is always in the
/// present or future relative to the last poll.
pub struct AcceptGate {
    state: GateState,
    /// Next instant at which polling is meaningful.
    wakeup_at: Instant,
    /// Last moment the descriptor showed activity; drives idle accounting.
    last_event_at: Instant,
    /// Current sampling interval in microseconds; halves while sampling.
    interval_us: u64,

    rate_limit: Duration,
    sample_base_us: u64,
    idle_timeout: Option<Duration>,
    min_workers: usize,
}

impl AcceptGate {
    /// Builds a gate from the supervisor configuration.
    ///
    /// The idle window starts at construction: with no activity ever seen,
    /// idle shutdown triggers `idle_timeout` after startup.
    pub fn new(cfg: &Config) -> Self {
        let now = clock::now();
        Self {
            state: GateState::Idle,
            wakeup_at: now,
            last_event_at: now,
            interval_us: 0,
            rate_limit: cfg.rate_limit,
            sample_base_us: cfg.sample_base.as_micros().min(u64::MAX as u128) as u64,
            idle_timeout: cfg.idle_timeout(),
            min_workers: cfg.min_workers,
        }
    }

    /// Decides whether to spawn, wait, or shut down.
    ///
    /// May block for a bounded duration (scheduled wakeups and the readiness
    /// wait), never indefinitely when an idle timeout applies. Two
    /// consecutive [`Decision::Spawn`] results are always separated by at
    /// least the configured rate limit.
    pub async fn poll(&mut self, fd: &dyn Pollable, workers: usize) -> Decision {
        let now = clock::now();

        // Coming out of a spawn: enforce the rate limit purely by postponing
        // the next real poll. No descriptor check this cycle.
        if self.state == GateState::Backoff {
            self.wakeup_at = now + self.rate_limit;
            self.state = GateState::Idle;
            return Decision::None;
        }

        // Honor a scheduled wakeup (post-backoff or post-sample delay).
        if let Some(remaining) = clock::remaining(self.wakeup_at, now) {
            tokio::time::sleep(remaining).await;
            return Decision::None;
        }

        let mut wait = READY_WAIT_DEFAULT;
        if self.state == GateState::Idle {
            if let Some(idle) = self.idle_timeout {
                if workers == 0 && self.min_workers == 0 {
                    let since = now.duration_since(self.last_event_at);
                    match idle.checked_sub(since) {
                        // Idle past the window, no spare workers, no floor
                        // to keep: time to go.
                        None => return Decision::ShutdownIdle,
                        Some(zero) if zero.is_zero() => return Decision::ShutdownIdle,
                        // Never wait beyond the idle deadline.
                        Some(left) => wait = left,
                    }
                }
            }
        }

        match fd.ready(wait).await {
            Ok(Readiness::TimedOut) | Err(_) => {
                self.state = GateState::Idle;
                Decision::None
            }
            Ok(Readiness::Ready) => {
                self.last_event_at = clock::now();

                if self.state == GateState::Idle {
                    self.state = GateState::Sampling;
                    self.interval_us = self.sample_base_us;
                }
                self.interval_us /= 2;

                // No worker to absorb the load, or the interval has decayed
                // below usefulness: spawn now, rate-limit what follows.
                if workers == 0 || self.interval_us < 1 {
                    self.state = GateState::Backoff;
                    return Decision::Spawn;
                }

                self.wakeup_at = clock::after_micros(clock::now(), self.interval_us);
                Decision::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Step {
        Ready,
        TimedOut,
        Fail,
    }

    /// Scripted readiness source; sleeps through the requested wait on
    /// timeouts so the paused clock advances the way a real wait would.
    struct ScriptedFd {
        script: Mutex<VecDeque<Step>>,
        seen_waits: Mutex<Vec<Duration>>,
    }

    impl ScriptedFd {
        fn new(steps: &[Step]) -> Self {
            Self {
                script: Mutex::new(steps.iter().copied().collect()),
                seen_waits: Mutex::new(Vec::new()),
            }
        }

        fn always_ready() -> Self {
            Self::new(&[])
        }

        fn waits(&self) -> Vec<Duration> {
            self.seen_waits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Pollable for ScriptedFd {
        async fn ready(&self, timeout: Duration) -> io::Result<Readiness> {
            self.seen_waits.lock().unwrap().push(timeout);
            let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Ready);
            match step {
                Step::Ready => Ok(Readiness::Ready),
                Step::TimedOut => {
                    tokio::time::sleep(timeout).await;
                    Ok(Readiness::TimedOut)
                }
                Step::Fail => Err(io::Error::other("poll failed")),
            }
        }
    }

    fn cfg() -> Config {
        Config {
            worker_program: PathBuf::from("/bin/true"),
            ..Config::default()
        }
    }

    /// Polls until the gate yields a non-None decision, with a cycle bound
    /// so a wedged gate fails the test instead of hanging it.
    async fn poll_until_decision(
        gate: &mut AcceptGate,
        fd: &ScriptedFd,
        workers: usize,
    ) -> Decision {
        for _ in 0..64 {
            match gate.poll(fd, workers).await {
                Decision::None => continue,
                other => return other,
            }
        }
        panic!("gate never reached a decision");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_workers_spawns_on_first_readiness() {
        let mut gate = AcceptGate::new(&cfg());
        let fd = ScriptedFd::always_ready();
        assert_eq!(gate.poll(&fd, 0).await, Decision::Spawn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_interval_halves_until_spawn() {
        let config = Config {
            sample_base: Duration::from_micros(16_000),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::always_ready();

        // First readiness: IDLE → SAMPLING, interval 16000/2 = 8000.
        assert_eq!(gate.poll(&fd, 1).await, Decision::None);
        assert_eq!(gate.interval_us, 8_000);
        assert_eq!(gate.state, GateState::Sampling);

        // Each sampling cycle is two polls: one that sleeps out the
        // scheduled wakeup and one that sees readiness and halves.
        let mut last = gate.interval_us;
        loop {
            match gate.poll(&fd, 1).await {
                Decision::None => {
                    if gate.state == GateState::Sampling && gate.interval_us != last {
                        assert_eq!(gate.interval_us, last / 2, "interval must halve");
                        last = gate.interval_us;
                    }
                }
                Decision::Spawn => break,
                other => panic!("unexpected decision {other:?}"),
            }
        }
        assert_eq!(gate.state, GateState::Backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_spawns_separated_by_rate_limit() {
        let rate = Duration::from_micros(1_000_000);
        let config = Config {
            rate_limit: rate,
            sample_base: Duration::from_micros(16_000),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::always_ready();

        assert_eq!(gate.poll(&fd, 0).await, Decision::Spawn);
        let first_spawn = clock::now();

        let second = poll_until_decision(&mut gate, &fd, 0).await;
        assert_eq!(second, Decision::Spawn);
        assert!(
            clock::now().duration_since(first_spawn) >= rate,
            "spawn decisions must be at least the rate limit apart"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_postpones_without_touching_descriptor() {
        let config = Config {
            rate_limit: Duration::from_micros(1_000_000),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::always_ready();

        assert_eq!(gate.poll(&fd, 0).await, Decision::Spawn);
        let polls_before = fd.waits().len();

        // The backoff cycle postpones the wakeup and never consults the fd.
        let before = clock::now();
        assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        assert_eq!(fd.waits().len(), polls_before);
        assert_eq!(gate.state, GateState::Idle);
        assert_eq!(
            gate.wakeup_at,
            before + Duration::from_micros(1_000_000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_shutdown_after_quiet_window() {
        let config = Config {
            idle_timeout: Duration::from_secs(2),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::new(&[Step::TimedOut, Step::TimedOut]);

        // First poll waits out the idle window, second observes it expired.
        assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        assert_eq!(gate.poll(&fd, 0).await, Decision::ShutdownIdle);

        // The wait was capped by the idle deadline, not the 60s default.
        assert_eq!(fd.waits(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_standing_floor_disables_idle_shutdown() {
        let config = Config {
            idle_timeout: Duration::from_secs(2),
            min_workers: 1,
            max_workers: 4,
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::new(&[Step::TimedOut, Step::TimedOut, Step::TimedOut]);

        // Even with zero live workers, min_workers > 0 keeps the gate
        // waiting with the default timeout forever.
        for _ in 0..3 {
            assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        }
        assert!(fd.waits().iter().all(|w| *w == READY_WAIT_DEFAULT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_workers_defer_idle_shutdown() {
        let config = Config {
            idle_timeout: Duration::from_secs(2),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::new(&[Step::TimedOut]);

        // A live worker means the idle deadline does not apply.
        assert_eq!(gate.poll(&fd, 1).await, Decision::None);
        assert_eq!(fd.waits(), vec![READY_WAIT_DEFAULT]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_error_returns_to_idle() {
        let config = Config {
            sample_base: Duration::from_micros(16_000),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::new(&[Step::Ready, Step::Fail]);

        // Enter SAMPLING first, then fail the next wait.
        assert_eq!(gate.poll(&fd, 1).await, Decision::None);
        assert_eq!(gate.state, GateState::Sampling);

        let decision = poll_until_decision_or_idle(&mut gate, &fd).await;
        assert_eq!(decision, Decision::None);
        assert_eq!(gate.state, GateState::Idle);
    }

    /// Drives the gate through scheduled sleeps until a poll actually
    /// consults the descriptor, then returns that poll's decision.
    async fn poll_until_decision_or_idle(gate: &mut AcceptGate, fd: &ScriptedFd) -> Decision {
        let waits_before = fd.waits().len();
        for _ in 0..8 {
            let d = gate.poll(fd, 1).await;
            if fd.waits().len() > waits_before {
                return d;
            }
        }
        panic!("gate never consulted the descriptor");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_wait_is_sixty_seconds() {
        let mut gate = AcceptGate::new(&cfg());
        let fd = ScriptedFd::new(&[Step::TimedOut]);
        assert_eq!(gate.poll(&fd, 3).await, Decision::None);
        assert_eq!(fd.waits(), vec![READY_WAIT_DEFAULT]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_runs_from_last_activity() {
        let config = Config {
            idle_timeout: Duration::from_secs(3),
            rate_limit: Duration::from_secs(1),
            ..cfg()
        };
        let mut gate = AcceptGate::new(&config);
        let fd = ScriptedFd::new(&[Step::Ready, Step::TimedOut]);

        // Activity at t0 spawns immediately (no workers to absorb it).
        assert_eq!(gate.poll(&fd, 0).await, Decision::Spawn);
        // Backoff cycle postpones by the rate limit, next poll sleeps it out.
        assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        // One second of the idle window is already spent; the next wait is
        // capped at the remaining two seconds, then the window expires.
        assert_eq!(gate.poll(&fd, 0).await, Decision::None);
        assert_eq!(gate.poll(&fd, 0).await, Decision::ShutdownIdle);

        assert_eq!(
            fd.waits(),
            vec![Duration::from_secs(3), Duration::from_secs(2)]
        );
    }
}
