use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Origin of the deadline clock, fixed on first use.
static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Returns the current time in milliseconds on the deadline clock.
///
/// The value never decreases and is always at least `1`.
///
/// # Examples
///
/// ```rust
/// let before = messenger::time::now_millis();
/// let after = messenger::time::now_millis();
/// assert!(before >= 1 && after >= before);
/// ```
pub fn now_millis() -> u64 {
    let origin = ORIGIN.get_or_init(Instant::now);
    to_millis(origin.elapsed()).saturating_add(1)
}

/// Returns the deadline lying `delay` after now.
///
/// Saturates instead of overflowing for very large delays.
pub fn deadline_after(delay: Duration) -> u64 {
    now_millis().saturating_add(to_millis(delay))
}

fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
