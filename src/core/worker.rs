//! # Worker bootstrap: descriptor hand-off and image replacement.
//!
//! Each worker is created by duplicating the guarded descriptor onto the
//! new process's standard input and replacing the process image with the
//! configured worker program. [`std::process::Command`] performs exactly
//! that sequence (fork, dup the handed descriptor to fd 0, exec); the
//! original descriptor carries close-on-exec, so the stdin copy is the only
//! handle a worker ever sees.
//!
//! A failure anywhere in the sequence surfaces as a spawn error in the
//! supervisor and leaves no worker process behind; the supervisor treats it
//! as recoverable. The parent never blocks on the child's startup, and
//! once exec succeeds the worker is fully autonomous; the supervisor only
//! ever talks to it again via process-group signals and exit status.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::Config;
use crate::core::fd::GuardedFd;

/// Recipe for one worker process.
///
/// Built once from the configuration; every spawn duplicates the guarded
/// descriptor afresh (the supervisor retains its own copy throughout).
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
    fd: GuardedFd,
}

impl WorkerCommand {
    /// Captures the worker program, argument vector, and the descriptor to
    /// re-home onto each worker's stdin.
    pub fn new(cfg: &Config, fd: GuardedFd) -> Self {
        Self {
            program: cfg.worker_program.clone(),
            args: cfg.worker_args.clone(),
            fd,
        }
    }

    /// Returns the worker program path, for logging.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Creates one worker process and returns its pid.
    ///
    /// Duplication of the descriptor and replacement of the image are both
    /// reported here; on error no worker exists and the pool count must not
    /// change.
    pub fn spawn(&self) -> io::Result<u32> {
        let stdin = self.fd.dup()?;
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .spawn()?;
        // The handle is dropped deliberately: workers are reaped as "any
        // finished child", never joined individually.
        Ok(child.id())
    }
}
