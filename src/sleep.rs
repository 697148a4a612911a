use std::time::Duration;

use crate::context::TimerContext;
use crate::error::ContextError;

/// Puts the calling task to sleep until the given duration has passed, or
/// until the context is done, whichever comes first, in which case the
/// context's error is returned.
pub async fn sleep(context: &TimerContext, duration: Duration) -> Result<(), ContextError> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = context.done() => Err(context.error().unwrap_or(ContextError::Cancelled)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;
    use tokio::time::Instant;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn completes_after_the_full_duration() {
        let timeline = Timeline::with_resolution(Duration::from_millis(10));
        let context = timeline.timeout(Duration::from_secs(5));

        let start = Instant::now();
        assert_ok!(sleep(&context, Duration::from_millis(100)).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn reports_expiry_when_interrupted() {
        let timeline = Timeline::with_resolution(Duration::from_millis(1));
        let context = timeline.timeout(Duration::from_millis(10));

        let result = sleep(&context, Duration::from_secs(60)).await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn reports_cancellation_immediately() {
        let timeline = Timeline::new();
        let context = timeline.timeout(Duration::from_secs(10));
        timeline.cancel();

        let result = sleep(&context, Duration::from_secs(10)).await;
        assert_eq!(result, Err(ContextError::Cancelled));
    }
}
