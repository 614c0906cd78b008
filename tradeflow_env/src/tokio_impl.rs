//! Production implementation of AnimationContext using Tokio.

use crate::error::EnvError;
use crate::AnimationContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default display refresh rate.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Production context backed by the Tokio timer wheel.
///
/// Frames are aligned to a fixed grid starting at context creation, the
/// way a display's vsync would be: a frame request made mid-interval waits
/// for the next grid point rather than a full interval.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Spacing of the frame grid
    frame_interval: Duration,
}

impl TokioContext {
    /// Creates a new TokioContext at the default frame rate.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_interval: Duration::from_secs(1) / DEFAULT_FRAME_RATE_HZ,
        }
    }

    /// Creates a context ticking at `hz` frames per second.
    pub fn with_frame_rate(hz: u32) -> Result<Self, EnvError> {
        if hz == 0 || hz > 1000 {
            return Err(EnvError::InvalidFrameRate(hz));
        }
        Ok(Self {
            start: Instant::now(),
            frame_interval: Duration::from_secs(1) / hz,
        })
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnimationContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn next_frame(&self) -> Duration {
        let elapsed = self.start.elapsed().as_nanos();
        let step = self.frame_interval.as_nanos().max(1);
        let next = (elapsed / step + 1) * step;
        let deadline = self.start + Duration::from_nanos(next as u64);
        tokio::time::sleep_until(deadline).await;
        self.now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_monotonic_and_grid_aligned() {
        let ctx = TokioContext::with_frame_rate(50).unwrap();
        let f1 = ctx.next_frame().await;
        let f2 = ctx.next_frame().await;

        assert!(f2 > f1);
        assert_eq!(f1, Duration::from_millis(20));
        assert_eq!(f2, Duration::from_millis(40));
    }

    #[test]
    fn test_rejects_zero_frame_rate() {
        assert!(matches!(
            TokioContext::with_frame_rate(0),
            Err(EnvError::InvalidFrameRate(0))
        ));
    }

    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }
}
