use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::context::TimerContext;
use crate::jitter::jitter;

/// Resolution used by [`Timeline::new`] and as the fallback for a zero
/// resolution passed to the other constructors.
pub const DEFAULT_RESOLUTION: Duration = Duration::from_millis(100);

/// Number of resolution windows between opportunistic cleanup sweeps.
const CLEANUP_INTERVAL: u64 = 100;

/// Shared timeline for high resolution timers, with 10 millisecond
/// accuracy.
pub static HIGH_RES: LazyLock<Timeline> =
    LazyLock::new(|| Timeline::with_resolution(Duration::from_millis(10)));

/// Shared timeline for low resolution timers, with 1 second accuracy.
/// This timeline is typically useful for network timeouts.
///
/// ```no_run
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let context = timeline::LOW_RES.timeout(std::time::Duration::from_secs(10));
///
/// tokio::select! {
///     _ = send_request() => {}
///     _ = context.done() => { /* request timed out */ }
/// }
/// # }
/// # async fn send_request() {}
/// ```
pub static LOW_RES: LazyLock<Timeline> =
    LazyLock::new(|| Timeline::with_resolution(Duration::from_secs(1)));

/// A cache of deadlines represented by shared timeout contexts.
///
/// A timeline has a resolution representing the accuracy of the deadlines
/// it maintains: all deadlines falling within the same resolution window
/// share the same [`TimerContext`], which makes it cheap to create
/// thousands, or even millions of them, since the runtime only needs to
/// maintain a single timer per window.
///
/// Timelines are safe to use concurrently from any number of tasks or
/// threads. Contexts must be created from within a Tokio runtime, since
/// each window drives its expiry on a spawned task.
pub struct Timeline {
    resolution: Duration,
    background: Option<CancellationToken>,
    epoch: Instant,
    buckets: RwLock<HashMap<u64, TimerContext>>,

    // Nanoseconds since `epoch` after which the next sweep is due, and
    // the flag that hands the sweep to a single caller at a time.
    cleanup_due: AtomicU64,
    cleanup_gate: AtomicBool,

    #[cfg(test)]
    created: AtomicU64,
}

impl Timeline {
    /// A timeline with the default 100 millisecond resolution.
    pub fn new() -> Self {
        Self::with_resolution(DEFAULT_RESOLUTION)
    }

    /// A timeline whose contexts share deadlines within `resolution`-sized
    /// windows.
    ///
    /// The lower the resolution the more accurate the timers are, but it
    /// also means the timeline puts more pressure on the runtime and uses
    /// more memory. A zero resolution falls back to [`DEFAULT_RESOLUTION`].
    pub fn with_resolution(resolution: Duration) -> Self {
        Self::build(resolution, None)
    }

    /// Like [`Timeline::with_resolution`], with every context derived from
    /// `background`: cancelling that token cancels them all.
    pub fn with_background(resolution: Duration, background: CancellationToken) -> Self {
        Self::build(resolution, Some(background))
    }

    fn build(resolution: Duration, background: Option<CancellationToken>) -> Self {
        let resolution = if resolution.is_zero() {
            DEFAULT_RESOLUTION
        } else {
            resolution
        };
        Self {
            resolution,
            background,
            epoch: Instant::now(),
            buckets: RwLock::new(HashMap::new()),
            cleanup_due: AtomicU64::new(0),
            cleanup_gate: AtomicBool::new(false),
            #[cfg(test)]
            created: AtomicU64::new(0),
        }
    }

    /// The accuracy of the deadlines this timeline maintains.
    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    /// Returns a context which expires after the given amount of time has
    /// passed, plus up to the timeline's resolution.
    pub fn timeout(&self, timeout: Duration) -> TimerContext {
        let now = Instant::now();
        self.context(now + timeout, now)
    }

    /// Returns a context which expires when the given deadline is reached,
    /// plus up to the timeline's resolution.
    pub fn deadline(&self, deadline: Instant) -> TimerContext {
        self.context(deadline, Instant::now())
    }

    /// Returns a context which expires when `at` is reached, using `now`
    /// as the current time.
    ///
    /// `now` only feeds the cleanup schedule; [`Timeline::timeout`] and
    /// [`Timeline::deadline`] are the usual entry points, this form exists
    /// for callers that manage their own clock.
    pub fn context(&self, at: Instant, now: Instant) -> TimerContext {
        let key = self.bucket_key(at);

        let cached = self.buckets.read().get(&key).cloned();
        let context = match cached {
            Some(context) => context,
            None => self.create(key),
        };

        self.maybe_cleanup(now);
        context
    }

    /// Cancels all outstanding contexts and discards every bucket. The
    /// timeline itself remains usable; new contexts repopulate the cache.
    pub fn cancel(&self) {
        let mut buckets = self.buckets.write();
        let dropped = buckets.len();
        for (_, context) in buckets.drain() {
            context.cancel();
        }
        drop(buckets);

        if dropped > 0 {
            log::debug!("cancelled {} outstanding bucket(s)", dropped);
        }
    }

    fn create(&self, key: u64) -> TimerContext {
        // The jitter draw happens before taking the write lock; when
        // another caller wins the race below, the draw is discarded.
        let expiration = self.epoch + Duration::from_nanos(key) + jitter(self.resolution);

        let mut buckets = self.buckets.write();
        buckets
            .entry(key)
            .or_insert_with(|| {
                #[cfg(test)]
                self.created.fetch_add(1, Ordering::Relaxed);
                log::trace!("created bucket {} expiring at {:?}", key, expiration);
                TimerContext::with_deadline(self.background.as_ref(), expiration)
            })
            .clone()
    }

    fn bucket_key(&self, at: Instant) -> u64 {
        // Round up to the nearest resolution multiple, unless the instant
        // already is a multiple of it. Resolution is never zero.
        let resolution = self.resolution.as_nanos() as u64;
        self.nanos_since_epoch(at)
            .div_ceil(resolution)
            .saturating_mul(resolution)
    }

    fn nanos_since_epoch(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_nanos() as u64
    }

    fn maybe_cleanup(&self, now: Instant) {
        let due = self.cleanup_due.load(Ordering::Acquire);
        if due != 0 && self.nanos_since_epoch(now) <= due {
            return;
        }
        if self
            .cleanup_gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let step = (self.resolution.as_nanos() as u64).saturating_mul(CLEANUP_INTERVAL);
        self.cleanup_due
            .store(due.saturating_add(step), Ordering::Release);
        self.cleanup(now);
        self.cleanup_gate.store(false, Ordering::Release);
    }

    fn cleanup(&self, now: Instant) {
        // Entries are only reclaimed one full window past their deadline.
        let grace = self.resolution;
        let expired: Vec<(u64, TimerContext)> = self
            .buckets
            .read()
            .iter()
            .filter(|(_, context)| now > context.deadline() + grace)
            .map(|(key, context)| (*key, context.clone()))
            .collect();

        let mut reclaimed = 0;
        for (key, context) in expired {
            let mut buckets = self.buckets.write();
            if buckets.get(&key).is_some_and(|current| current.same(&context)) {
                buckets.remove(&key);
                reclaimed += 1;
            }
            drop(buckets);
            context.cancel();
        }

        if reclaimed > 0 {
            log::debug!("cleanup reclaimed {} expired bucket(s)", reclaimed);
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
