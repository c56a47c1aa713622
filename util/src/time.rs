//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of seconds into a [`std::time::Duration`].
///
/// Negative values are clamped to a zero duration.
pub fn seconds_to_duration(seconds: f64) -> std::time::Duration {
    if seconds <= 0.0 {
        std::time::Duration::from_secs(0)
    } else {
        std::time::Duration::from_secs_f64(seconds)
    }
}
