use std::sync::LazyLock;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

static RNG: LazyLock<Mutex<StdRng>> = LazyLock::new(|| Mutex::new(StdRng::from_os_rng()));

/// Uniformly distributed offset in `[0, within)`.
///
/// Each bucket gets one such offset added to its deadline when it is
/// created, so that buckets populated by synchronized callers do not all
/// expire on the exact window boundary.
pub(crate) fn jitter(within: Duration) -> Duration {
    let nanos = within.as_nanos() as u64;
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(RNG.lock().random_range(0..nanos))
}
