//! # Descriptor-redirection bootstrap.
//!
//! The supervisor inherits exactly one descriptor (the socket to guard)
//! on its standard input. [`swizzle_stdio`] moves it off fd 0 and points
//! the standard streams at `/dev/null`, which stops careless libraries
//! (and the supervisor itself) from printing to the network.
//!
//! Layout after the swizzle:
//! - fd 0, 1, 2 → `/dev/null`
//! - returned `OwnedFd` → the guarded descriptor, close-on-exec so workers
//!   only ever see the stdin duplicate handed to them at spawn
//!
//! Runs once, before the loop; any failure here is fatal to the process.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Re-homes the inherited descriptor and nulls the standard streams.
///
/// Returns the guarded descriptor, ready for [`GuardedFd`](crate::GuardedFd).
pub fn swizzle_stdio() -> io::Result<OwnedFd> {
    let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;

    dup2(null.as_raw_fd(), libc::STDOUT_FILENO)?;
    dup2(null.as_raw_fd(), libc::STDERR_FILENO)?;

    // Lift the inherited descriptor off fd 0, close-on-exec from birth.
    let guarded = dup_cloexec(libc::STDIN_FILENO)?;

    dup2(null.as_raw_fd(), libc::STDIN_FILENO)?;

    Ok(guarded)
}

fn dup2(from: RawFd, to: RawFd) -> io::Result<()> {
    // SAFETY: both descriptors are owned by this process; dup2 does not
    // take ownership of either.
    if unsafe { libc::dup2(from, to) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn dup_cloexec(fd: RawFd) -> io::Result<OwnedFd> {
    // SAFETY: F_DUPFD_CLOEXEC returns a fresh descriptor this process owns.
    let dup = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 3) };
    if dup == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `dup` is a freshly created, valid descriptor not owned
    // anywhere else.
    Ok(unsafe { OwnedFd::from_raw_fd(dup) })
}
