//! Wall-clock projections.
//!
//! Remaining and elapsed time are always derived from an absolute anchor and
//! the current instant, never from a count of delivered ticks. Any observer
//! holding the same anchor computes the same value.

use super::mode::STOPWATCH_CAP_SECS;

/// Seconds left until `target_ms`, rounded to the nearest second, floored at 0.
pub fn countdown_left(target_ms: i64, now_ms: i64) -> u64 {
    round_secs(target_ms.saturating_sub(now_ms))
}

/// Seconds elapsed since `start_ms`, rounded, clamped to the stopwatch cap.
///
/// A clock that moved backwards past the anchor yields 0.
pub fn stopwatch_elapsed(start_ms: i64, now_ms: i64) -> u64 {
    round_secs(now_ms.saturating_sub(start_ms)).min(STOPWATCH_CAP_SECS)
}

fn round_secs(diff_ms: i64) -> u64 {
    if diff_ms <= 0 {
        return 0;
    }
    ((diff_ms as u64) + 500) / 1000
}
