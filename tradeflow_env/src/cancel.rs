//! Cancellation scope shared by every suspension point of one run.
//!
//! A scope wraps a [`CancellationToken`] and counts the suspension points
//! that are currently parked on it. Cancelling the scope resolves every
//! parked frame or delay wait immediately; nothing is ever rejected.

use crate::AnimationContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a cancellable wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// The wait ran to completion
    Continue,
    /// The scope was cancelled before or during the wait
    Cancelled,
}

impl Flow {
    /// Returns true if the wait was cut short.
    pub fn is_cancelled(self) -> bool {
        matches!(self, Flow::Cancelled)
    }
}

/// Cancellation scope for one sequence run.
///
/// Clones share the same token and pending counter.
#[derive(Debug, Clone)]
pub struct CancelScope {
    token: CancellationToken,
    pending: Arc<AtomicUsize>,
}

impl CancelScope {
    /// Creates a standalone scope.
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Creates a scope that is also cancelled when `parent` is.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::from_token(parent.child_token())
    }

    fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Flips the scope. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the scope (or its parent) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of frame/delay waits currently parked on this scope.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns a clone of the underlying token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the next frame.
    ///
    /// Returns the frame timestamp, or `None` if the scope was cancelled
    /// before the frame fired. The cancellation check happens both before
    /// parking and after waking, so a caller that receives `Some` may
    /// mutate state for that frame.
    pub async fn next_frame<C>(&self, ctx: &C) -> Option<Duration>
    where
        C: AnimationContext + ?Sized,
    {
        if self.is_cancelled() {
            return None;
        }
        let _parked = Parked::enter(&self.pending);
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            stamp = ctx.next_frame() => {
                if self.is_cancelled() {
                    None
                } else {
                    Some(stamp)
                }
            }
        }
    }

    /// Waits for `duration`, resolving early on cancellation.
    pub async fn delay<C>(&self, ctx: &C, duration: Duration) -> Flow
    where
        C: AnimationContext + ?Sized,
    {
        if self.is_cancelled() {
            return Flow::Cancelled;
        }
        let _parked = Parked::enter(&self.pending);
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Flow::Cancelled,
            _ = ctx.sleep(duration) => {
                if self.is_cancelled() {
                    Flow::Cancelled
                } else {
                    Flow::Continue
                }
            }
        }
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts a parked wait for as long as it is alive, including when the
/// wait future is dropped mid-flight.
struct Parked(Arc<AtomicUsize>);

impl Parked {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for Parked {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
