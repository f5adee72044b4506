//! Error types used by the preforkd supervisor.
//!
//! This module defines two error enums:
//!
//! - [`ConfigError`]: invalid configuration, rejected before the loop starts.
//! - [`RuntimeError`]: setup failures of the supervisor process itself.
//!
//! Steady-state failures (spawn failure, reap failure) are deliberately
//! **not** here: they are recoverable by design, reported as events, and the
//! loop continues. Only what must stop the process before or at startup is
//! modeled as an error.

use thiserror::Error;

/// # Configuration errors.
///
/// Rejected by [`Config::validate`](crate::Config::validate) before any
/// worker is spawned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The pool band is inverted; no valid worker count satisfies it.
    #[error("max_workers ({max}) < min_workers ({min})")]
    BoundsInverted {
        /// Configured floor.
        min: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// No worker program was configured; there is nothing to spawn.
    #[error("no worker program configured")]
    MissingWorkerProgram,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::BoundsInverted { .. } => "config_bounds_inverted",
            ConfigError::MissingWorkerProgram => "config_missing_worker_program",
        }
    }
}

/// # Errors produced by supervisor startup.
///
/// These represent failures setting up the supervisor process itself.
/// Once the loop is running, nothing escalates to a process-wide abort.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration rejected before the loop started.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Could not register the termination/child signal listeners.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// The underlying registration error.
        #[source]
        source: std::io::Error,
    },

    /// Could not move the supervisor into its own process group.
    #[error("failed to set process group: {source}")]
    ProcessGroup {
        /// The underlying errno.
        #[source]
        source: nix::errno::Errno,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::Signals { .. } => "runtime_signals",
            RuntimeError::ProcessGroup { .. } => "runtime_process_group",
        }
    }
}
