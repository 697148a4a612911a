use thiserror::Error;

/// Why a [`TimerContext`](crate::TimerContext) stopped waiting.
///
/// A context reports an error only once its done-signal has fired. Until
/// then, [`TimerContext::error`](crate::TimerContext::error) returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The shared deadline passed before the context was cancelled.
    #[error("deadline has elapsed")]
    DeadlineExceeded,
    /// The context was cancelled before its deadline, either through
    /// [`Timeline::cancel`](crate::Timeline::cancel) or through the
    /// background token it was derived from.
    #[error("context was cancelled")]
    Cancelled,
}
