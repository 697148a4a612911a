use std::sync::{Arc, OnceLock};

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

/// A cancellable handle that expires at a fixed deadline.
///
/// Contexts are handed out by [`Timeline`](crate::Timeline); every caller
/// whose requested expiration falls into the same time window receives a
/// clone of the same underlying context, so one timer serves them all.
///
/// Cloning is cheap and clones share state: once any clone observes the
/// done-signal, all of them do.
#[derive(Clone, Debug)]
pub struct TimerContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    deadline: Instant,
    token: CancellationToken,
    cause: OnceLock<ContextError>,
}

impl TimerContext {
    /// Creates a context that fires at `deadline`, optionally derived from a
    /// background token so that cancelling the token cancels the context.
    ///
    /// A deadline that has already passed produces a context that is born
    /// done, without going through the timer at all.
    pub(crate) fn with_deadline(background: Option<&CancellationToken>, deadline: Instant) -> Self {
        let token = match background {
            Some(background) => background.child_token(),
            None => CancellationToken::new(),
        };
        let inner = Arc::new(Inner {
            deadline,
            token,
            cause: OnceLock::new(),
        });

        if deadline <= Instant::now() {
            let _ = inner.cause.set(ContextError::DeadlineExceeded);
            inner.token.cancel();
            return Self { inner };
        }

        let state = Arc::clone(&inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep_until(state.deadline) => {
                    // The cause is published before the done-signal fires.
                    let _ = state.cause.set(ContextError::DeadlineExceeded);
                    state.token.cancel();
                }
                _ = state.token.cancelled() => {}
            }
        });

        Self { inner }
    }

    /// The instant at which this context expires on its own.
    ///
    /// This already includes the window jitter picked when the context was
    /// created, so it may lie up to one resolution past the instant the
    /// caller asked for.
    pub fn deadline(&self) -> Instant {
        self.inner.deadline
    }

    /// Resolves once the context is done, whether it expired or was
    /// cancelled. Completes immediately if it already is.
    pub async fn done(&self) {
        self.inner.token.cancelled().await;
    }

    /// Whether the done-signal has fired.
    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// `None` while the context is live, then the terminal cause:
    /// [`ContextError::DeadlineExceeded`] if the deadline passed, or
    /// [`ContextError::Cancelled`] if it was cancelled first.
    pub fn error(&self) -> Option<ContextError> {
        if !self.inner.token.is_cancelled() {
            return None;
        }
        Some(self.inner.cause.get().copied().unwrap_or(ContextError::Cancelled))
    }

    /// A token that is cancelled when this context is done.
    ///
    /// Cancelling the returned token does not affect the context, so a
    /// single shared context can feed many independent cancellation scopes.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Marks the context cancelled before its deadline.
    pub(crate) fn cancel(&self) {
        let _ = self.inner.cause.set(ContextError::Cancelled);
        self.inner.token.cancel();
    }

    /// Whether both handles point at the same shared context.
    pub(crate) fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn expires_at_its_deadline() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let context = TimerContext::with_deadline(None, deadline);

        assert!(!context.is_done());
        assert_eq!(context.error(), None);
        assert_eq!(context.deadline(), deadline);

        context.done().await;

        assert!(context.is_done());
        assert!(Instant::now() >= deadline);
        assert_eq!(context.error(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn past_deadline_is_born_done() {
        let context = TimerContext::with_deadline(None, Instant::now());

        assert!(context.is_done());
        assert_eq!(context.error(), Some(ContextError::DeadlineExceeded));

        // Must not block.
        context.done().await;
    }

    #[tokio::test]
    async fn cancel_wins_over_a_future_deadline() {
        let context = TimerContext::with_deadline(None, Instant::now() + Duration::from_secs(60));

        context.cancel();

        assert!(context.is_done());
        assert_eq!(context.error(), Some(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn clones_share_the_done_signal() {
        let context = TimerContext::with_deadline(None, Instant::now() + Duration::from_secs(60));
        let clone = context.clone();
        assert!(context.same(&clone));

        context.cancel();

        assert!(clone.is_done());
        assert_eq!(clone.error(), Some(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn background_cancellation_propagates() {
        let background = CancellationToken::new();
        let context =
            TimerContext::with_deadline(Some(&background), Instant::now() + Duration::from_secs(60));

        assert!(!context.is_done());
        background.cancel();

        assert!(context.is_done());
        assert_eq!(context.error(), Some(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn child_tokens_follow_but_do_not_steer() {
        let context = TimerContext::with_deadline(None, Instant::now() + Duration::from_secs(60));

        let independent = context.child_token();
        independent.cancel();
        assert!(!context.is_done());

        let follower = context.child_token();
        context.cancel();
        assert!(follower.is_cancelled());
    }
}
