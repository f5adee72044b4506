//! # Absolute-time arithmetic for wakeup scheduling.
//!
//! The gate and the pool schedule everything against [`Instant`]
//! (re-exported from `tokio::time` so that paused-clock tests observe the
//! same timeline as the code under test). Durations carry microsecond
//! resolution; [`std::time::Duration`] keeps the sub-second component
//! normalized to `[0, 1_000_000)` microseconds, which is the invariant the
//! wakeup math relies on.
//!
//! ## Contents
//! - [`now`] current monotonic instant
//! - [`after_micros`] deadline = instant + microseconds
//! - [`remaining`] strictly-positive time left until a deadline

use std::time::Duration;

pub use tokio::time::Instant;

/// Returns the current instant on the runtime clock.
///
/// Under `tokio::time::pause` this is the paused (simulated) clock, which is
/// what makes the gate's timing properties testable without real waiting.
#[inline]
pub fn now() -> Instant {
    Instant::now()
}

/// Returns the instant `micros` microseconds after `from`.
#[inline]
pub fn after_micros(from: Instant, micros: u64) -> Instant {
    from + Duration::from_micros(micros)
}

/// Returns the time left until `deadline`, or `None` when the deadline is
/// now or already past.
///
/// Strictness matters: a deadline that is exactly "now" must not schedule a
/// zero-length sleep, it must fall through to the readiness check.
#[inline]
pub fn remaining(deadline: Instant, now: Instant) -> Option<Duration> {
    match deadline.checked_duration_since(now) {
        Some(d) if !d.is_zero() => Some(d),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micros_normalization_carries_into_seconds() {
        let d = Duration::from_micros(2_500_000);
        assert_eq!(d.as_secs(), 2);
        assert_eq!(d.subsec_micros(), 500_000);

        let sum = Duration::from_micros(900_000) + Duration::from_micros(200_000);
        assert_eq!(sum.as_secs(), 1);
        assert_eq!(sum.subsec_micros(), 100_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_future_deadline() {
        let base = now();
        let deadline = after_micros(base, 1_500_000);
        assert_eq!(
            remaining(deadline, base),
            Some(Duration::from_micros(1_500_000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_is_none_for_present_and_past() {
        let base = now();
        assert_eq!(remaining(base, base), None);

        let past = base;
        tokio::time::advance(Duration::from_millis(5)).await;
        assert_eq!(remaining(past, now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_straddles_second_boundary() {
        let base = now();
        let deadline = after_micros(base, 1_000_000);
        tokio::time::advance(Duration::from_micros(999_999)).await;
        // 1µs left: still strictly positive.
        assert_eq!(remaining(deadline, now()), Some(Duration::from_micros(1)));
    }
}
