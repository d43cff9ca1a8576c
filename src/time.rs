//! Monotonic timebase.

use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Seconds since an arbitrary process-wide origin, from the platform's
/// monotonic clock. The origin is fixed on first use.
pub fn monotonic_seconds() -> f64 {
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}
