//! # Supervisor configuration.
//!
//! Provides [`Config`], the immutable settings for one supervisor run:
//! pool bounds, the admission gate's timing knobs, the idle timeout, and the
//! worker program. Built once (by the CLI or embedding code), validated
//! before the loop starts, read-only afterwards.
//!
//! ## Sentinel values
//! - `idle_timeout = 0s` → idle shutdown disabled
//! - `min_workers = 0` → no standing floor (a precondition for idle shutdown)

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Immutable configuration for a supervisor run.
///
/// ## Field semantics
/// - `min_workers`/`max_workers`: the pool band; validation rejects
///   `max_workers < min_workers`
/// - `rate_limit`: enforced minimum delay between two consecutive spawn
///   decisions (the BACKOFF floor)
/// - `sample_base`: initial sampling granularity; halves under sustained
///   activity until a spawn decision falls out
/// - `idle_timeout`: how long the pool may sit idle (zero live workers, no
///   descriptor activity) before the supervisor exits; `0s` disables it
/// - `worker_program`/`worker_args`: the image each worker execs into, with
///   the guarded descriptor re-homed onto its stdin
/// - `debug`: publish per-iteration gate decisions as events
#[derive(Clone, Debug)]
pub struct Config {
    /// Floor of the worker pool. The loop spawns unconditionally (before
    /// consulting the gate) while the live count is below this.
    pub min_workers: usize,

    /// Ceiling of the worker pool. At or above it the loop block-reaps
    /// before doing anything else.
    pub max_workers: usize,

    /// Minimum elapsed time between two consecutive spawn decisions.
    pub rate_limit: Duration,

    /// Initial sampling interval of the admission gate.
    pub sample_base: Duration,

    /// Idle shutdown window. `Duration::ZERO` disables idle shutdown.
    ///
    /// Only consulted when `min_workers == 0` and no worker is alive; a
    /// non-zero floor permanently disables idle shutdown.
    pub idle_timeout: Duration,

    /// Program each worker process execs into.
    pub worker_program: PathBuf,

    /// Arguments passed to the worker program (argv tail).
    pub worker_args: Vec<OsString>,

    /// Publish per-iteration `PollDecision` events.
    pub debug: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Checks the configuration invariants that must hold before the loop
    /// starts. Called by `Supervisor::new`; configuration errors are the
    /// only failure class that is fatal before the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers < self.min_workers {
            return Err(ConfigError::BoundsInverted {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        if self.worker_program.as_os_str().is_empty() {
            return Err(ConfigError::MissingWorkerProgram);
        }
        Ok(())
    }

    /// Returns the idle timeout as an `Option`.
    ///
    /// - `None` → idle shutdown disabled
    /// - `Some(d)` → shut down after `d` of applicable idleness
    #[inline]
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout == Duration::ZERO {
            None
        } else {
            Some(self.idle_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration, matching the historical option defaults:
    ///
    /// - `min_workers = 0`, `max_workers = 10`
    /// - `rate_limit = 32_768µs`, `sample_base = 16_384µs`
    /// - `idle_timeout = 0s` (disabled)
    /// - `debug = false`, `bus_capacity = 1024`
    ///
    /// `worker_program` is empty and must be set before validation passes.
    fn default() -> Self {
        Self {
            min_workers: 0,
            max_workers: 10,
            rate_limit: Duration::from_micros(32 * 1024),
            sample_base: Duration::from_micros(16 * 1024),
            idle_timeout: Duration::ZERO,
            worker_program: PathBuf::new(),
            worker_args: Vec::new(),
            debug: false,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            worker_program: PathBuf::from("/bin/true"),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_band_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let cfg = Config {
            min_workers: 5,
            max_workers: 2,
            ..valid()
        };
        match cfg.validate() {
            Err(ConfigError::BoundsInverted { min: 5, max: 2 }) => {}
            other => panic!("expected BoundsInverted, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_bounds_accepted() {
        let cfg = Config {
            min_workers: 3,
            max_workers: 3,
            ..valid()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_worker_program_rejected() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingWorkerProgram)
        ));
    }

    #[test]
    fn test_idle_timeout_sentinel() {
        assert_eq!(valid().idle_timeout(), None);
        let cfg = Config {
            idle_timeout: Duration::from_secs(30),
            ..valid()
        };
        assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(30)));
    }
}
