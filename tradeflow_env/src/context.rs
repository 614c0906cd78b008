//! Core animation context trait for Tradeflow sequences.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for frame and timer scheduling.
///
/// This trait abstracts the "render loop" so that the sequence engine can
/// run against a real clock (tokio) and a virtual clock (simulation) with
/// the same code.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - virtual clock with seeded frame jitter
///
/// # Suspension points
///
/// The engine only ever suspends in [`next_frame`](Self::next_frame) and
/// [`sleep`](Self::sleep). Both are raced against the run's cancellation
/// scope, so implementations never need to know about cancellation.
#[async_trait]
pub trait AnimationContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends until the next animation frame and returns its timestamp.
    ///
    /// All per-frame work of one frame must be derived from this single
    /// timestamp; callers never re-sample `now()` inside a frame.
    async fn next_frame(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Nominal spacing between two frames.
    fn frame_interval(&self) -> Duration;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
