//! Supervisor core: admission, pooling, and the main loop.
//!
//! Modules:
//! - [`fd`]: the guarded descriptor and its level-triggered readiness wait;
//! - [`gate`]: the adaptive admission state machine (IDLE/SAMPLING/BACKOFF);
//! - [`worker`]: per-worker bootstrap (descriptor re-homing + exec);
//! - [`pool`]: live-count tracking, spawning, reaping;
//! - [`shutdown`]: termination signal listeners;
//! - [`supervisor`]: the loop composing all of the above.

mod fd;
mod gate;
mod pool;
mod shutdown;
mod supervisor;
mod worker;

pub use fd::{GuardedFd, Pollable, Readiness};
pub use gate::{AcceptGate, Decision};
pub use pool::WorkerPool;
pub use supervisor::Supervisor;
