//! # Timeline
//!
//! Shared, low-resolution timeout contexts for Rust built on top of Tokio.
//!
//! This library maintains a cache of deadlines: every timeout or deadline
//! request that falls within the same resolution window receives the same
//! shared context, so creating thousands, or even millions of timeouts
//! only costs the runtime a single timer per window.
//!
//! ## Features
//!
//! - **Shared Timers**: All deadlines in a resolution window reuse one context
//! - **Asynchronous**: Built on Tokio; every context exposes an awaitable done-signal
//! - **Cancellable**: Cancel a whole timeline at once, or derive all of its contexts from a background `CancellationToken`
//! - **Jittered Expirations**: Per-window jitter spreads wakeups across the window
//! - **Self-Cleaning**: Stale windows are reclaimed by an opportunistic sweep piggybacked on normal calls
//! - **Presets**: Process-wide `HIGH_RES` (10ms) and `LOW_RES` (1s) timelines
//!
//! ## Quick Start
//!
//! ```rust
//! use timeline::{ContextError, Instant, Timeline};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let timeline = Timeline::with_resolution(Duration::from_millis(10));
//!
//!     // Both deadlines land in the same 10ms window, so the contexts
//!     // share a single timer.
//!     let at = Instant::now() + Duration::from_millis(50);
//!     let a = timeline.deadline(at);
//!     let b = timeline.deadline(at);
//!     assert_eq!(a.deadline(), b.deadline());
//!
//!     // Expiration is observable through every handle.
//!     a.done().await;
//!     assert!(b.is_done());
//!     assert_eq!(a.error(), Some(ContextError::DeadlineExceeded));
//! }
//! ```

mod context;
mod error;
mod jitter;
mod sleep;
mod timeline;

pub use context::TimerContext;
pub use error::ContextError;
pub use sleep::sleep;
pub use timeline::{Timeline, DEFAULT_RESOLUTION, HIGH_RES, LOW_RES};

// Re-export commonly used types for convenience
pub use std::time::Duration;
pub use tokio::time::Instant;
pub use tokio_util::sync::CancellationToken;
