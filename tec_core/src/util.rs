//! Common time helpers for tec_core.

use std::time::Duration;

/// Number of ticks a monitor window of `duration_s` seconds is split into.
///
/// Rounds `duration_s / tick` to nearest, and yields zero whenever the
/// window is at most half a tick (including zero, negative and NaN).
pub fn tick_count(duration_s: f64, tick: Duration) -> u64 {
    let tick_s = tick.as_secs_f64();
    if tick_s <= 0.0 || !duration_s.is_finite() || duration_s <= tick_s / 2.0 {
        return 0;
    }
    let n = (duration_s / tick_s).round();
    if n >= u64::MAX as f64 { u64::MAX } else { n as u64 }
}
