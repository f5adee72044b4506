//! # The guarded descriptor and its readiness wait.
//!
//! [`GuardedFd`] wraps the single inherited listening/connection descriptor.
//! The supervisor never reads or accepts on it; it only asks "is there
//! pending activity?" and hands duplicates to workers. Because the
//! descriptor is never consumed, the readiness wait must be level-triggered:
//! a pending connection stays readable across polls until a worker accepts
//! it. That rules out the runtime's edge-tracking fd registration, so the
//! wait is a plain `poll(2)` on a blocking-friendly thread.
//!
//! [`Pollable`] is the seam the admission gate polls through; tests drive
//! the gate with a scripted implementation on the paused clock.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Outcome of a bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The descriptor has pending activity.
    Ready,
    /// The wait elapsed without activity.
    TimedOut,
}

/// A source of readiness the admission gate can wait on.
///
/// The wait is bounded by `timeout` and reports whether the guarded
/// descriptor showed activity within it. Implementations must be safe to
/// call repeatedly without consuming the activity.
#[async_trait]
pub trait Pollable: Send + Sync {
    /// Waits up to `timeout` for pending activity on the descriptor.
    async fn ready(&self, timeout: Duration) -> io::Result<Readiness>;
}

/// The inherited descriptor the supervisor guards.
///
/// Shared read-only: the supervisor polls it for readiness and duplicates
/// it (never moves it) into each worker's stdin. Cloning is cheap; all
/// clones refer to the same underlying descriptor.
#[derive(Clone)]
pub struct GuardedFd {
    fd: Arc<OwnedFd>,
}

impl GuardedFd {
    /// Wraps an already-prepared descriptor.
    ///
    /// The descriptor should carry close-on-exec (the bootstrap sets it) so
    /// workers only ever see the stdin duplicate.
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd: Arc::new(fd) }
    }

    /// Duplicates the descriptor for hand-off to a worker's stdin.
    ///
    /// The supervisor retains its own copy across the worker's lifetime.
    pub fn dup(&self) -> io::Result<OwnedFd> {
        self.fd.try_clone()
    }
}

/// Upper bound on one `poll(2)` call. The overall wait is sliced so that a
/// wait abandoned at shutdown never pins a blocking thread (and with it,
/// runtime teardown) for longer than one slice.
const POLL_SLICE: Duration = Duration::from_secs(1);

#[async_trait]
impl Pollable for GuardedFd {
    async fn ready(&self, timeout: Duration) -> io::Result<Readiness> {
        let mut left = timeout;
        loop {
            let slice = left.min(POLL_SLICE);
            if poll_once(Arc::clone(&self.fd), slice).await? == Readiness::Ready {
                return Ok(Readiness::Ready);
            }
            left = left.saturating_sub(slice);
            if left.is_zero() {
                return Ok(Readiness::TimedOut);
            }
        }
    }
}

/// One bounded `poll(2)` on a blocking-friendly thread.
async fn poll_once(fd: Arc<OwnedFd>, timeout: Duration) -> io::Result<Readiness> {
    let millis = timeout.as_millis().min(i32::MAX as u128) as i32;

    let joined = tokio::task::spawn_blocking(move || {
        let mut pfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // Level-triggered check with the wait built into the syscall.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        match rc {
            0 => Ok(Readiness::TimedOut),
            n if n > 0 => Ok(Readiness::Ready),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    // A signal (typically SIGCHLD) bounced us out of the
                    // wait; not an error, just nothing pending yet.
                    Ok(Readiness::TimedOut)
                } else {
                    Err(err)
                }
            }
        }
    })
    .await;

    match joined {
        Ok(result) => result,
        Err(join_err) => Err(io::Error::other(join_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    fn pair() -> (GuardedFd, UnixStream) {
        let (a, b) = UnixStream::pair().expect("socketpair");
        (GuardedFd::new(OwnedFd::from(a)), b)
    }

    #[tokio::test]
    async fn test_times_out_on_quiet_descriptor() {
        let (fd, _peer) = pair();
        let got = fd.ready(Duration::from_millis(20)).await.unwrap();
        assert_eq!(got, Readiness::TimedOut);
    }

    #[tokio::test]
    async fn test_pending_data_is_ready() {
        let (fd, mut peer) = pair();
        peer.write_all(b"x").unwrap();
        let got = fd.ready(Duration::from_secs(5)).await.unwrap();
        assert_eq!(got, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_readiness_is_level_triggered() {
        let (fd, mut peer) = pair();
        peer.write_all(b"x").unwrap();
        // Unconsumed activity stays visible across repeated waits.
        for _ in 0..3 {
            let got = fd.ready(Duration::from_secs(5)).await.unwrap();
            assert_eq!(got, Readiness::Ready);
        }
    }

    #[tokio::test]
    async fn test_dup_shares_the_descriptor() {
        let (fd, mut peer) = pair();
        let dup = fd.dup().unwrap();
        drop(dup);
        // Dropping a duplicate must not close the supervisor's copy.
        peer.write_all(b"x").unwrap();
        let got = fd.ready(Duration::from_secs(5)).await.unwrap();
        assert_eq!(got, Readiness::Ready);
    }
}
