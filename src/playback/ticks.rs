//! Conversion between whole playback seconds and Jellyfin server ticks.

/// Server ticks per second (1 tick = 100ns).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Converts whole seconds to server ticks.
///
/// Saturates at `i64::MAX` instead of overflowing.
pub fn seconds_to_ticks(seconds: u64) -> i64 {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| s.checked_mul(TICKS_PER_SECOND))
        .unwrap_or(i64::MAX)
}

/// Converts server ticks to whole seconds, truncating any sub-second part.
/// Negative tick counts map to 0.
pub fn ticks_to_seconds(ticks: i64) -> u64 {
    if ticks <= 0 {
        return 0;
    }
    (ticks / TICKS_PER_SECOND) as u64
}
