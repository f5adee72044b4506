//! # preforkd
//!
//! **preforkd** is an adaptive pre-forking process supervisor: it owns one
//! inherited listening/connection descriptor, keeps a bounded pool of
//! worker processes ready to service it, and decides *when* to spawn a new
//! worker from an estimate of the incoming event rate, subject to a
//! min/max worker band and a rate limit that prevents fork storms.
//!
//! Workers are fully autonomous: each one gets the guarded descriptor as
//! its standard input and is replaced by the configured worker program.
//! The supervisor never inspects protocol content and never talks to a
//! worker again except by process-group signal and exit-status collection.
//!
//! ## Architecture
//! ```text
//!                    ┌────────────────────────────────────────────┐
//!                    │ Supervisor (single-threaded control loop)  │
//!                    │  - shutdown flag (CancellationToken,       │
//!                    │    set by SIGTERM/SIGHUP listener)         │
//!                    │  - Bus (broadcast events) ──► subscribers  │
//!                    └──────┬──────────────────────────┬──────────┘
//!                           ▼                          ▼
//!                    ┌──────────────┐          ┌──────────────┐
//!                    │  AcceptGate  │          │  WorkerPool  │
//!                    │ IDLE/SAMPLE/ │ Spawn ──►│ count, spawn,│
//!                    │   BACKOFF    │          │ reap (any)   │
//!                    └──────┬───────┘          └──────┬───────┘
//!                           │ poll(2), level-         │ fork/exec via
//!                           ▼ triggered              ▼ Command
//!                  guarded descriptor         worker processes
//!                  (inherited, shared          (stdin = dup of the
//!                   read-only)                  guarded descriptor)
//! ```
//!
//! ## Admission in one paragraph
//! Readiness on the guarded descriptor while IDLE starts a SAMPLING phase
//! whose interval halves on every further readiness; when the interval
//! decays below a microsecond, or there is no worker at all to absorb the
//! load, the gate answers `Spawn` and enters BACKOFF, which postpones the
//! next real poll by the configured rate limit. Prolonged silence with no
//! live workers and no configured floor ends the run gracefully.
//!
//! ## Example
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use preforkd::{bootstrap, Config, GuardedFd, Subscriber, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         min_workers: 1,
//!         max_workers: 8,
//!         worker_program: PathBuf::from("/usr/libexec/worker"),
//!         ..Config::default()
//!     };
//!
//!     let subs: Vec<Arc<dyn Subscriber>> = Vec::new();
//!     let sup = Supervisor::new(cfg, subs)?;
//!
//!     // Take over the inherited descriptor and null the std streams.
//!     let fd = GuardedFd::new(bootstrap::swizzle_stdio()?);
//!
//!     sup.run(fd).await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
mod clock;
mod config;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{AcceptGate, Decision, GuardedFd, Pollable, Readiness, Supervisor, WorkerPool};
pub use error::{ConfigError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscriber, SubscriberSet};

// Optional: a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging` (on by default).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
