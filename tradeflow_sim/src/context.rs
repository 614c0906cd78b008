//! Simulation context implementing AnimationContext for deterministic testing.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tradeflow_env::{AnimationContext, EnvError};

/// Frame spacing never strays further than this fraction from nominal.
const MAX_JITTER_FRACTION: f64 = 0.25;

/// Simulation context backed by deterministic time and RNG.
///
/// This implements `AnimationContext` using:
/// - A virtual clock that only moves when the engine waits
/// - A seeded ChaCha8 RNG for frame-interval jitter
/// - Waits that advance virtual time and then yield to the executor, so
///   tasks joined with the run (watchers, cancellers) interleave with it
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Deterministic RNG for jitter
    rng: Arc<Mutex<ChaCha8Rng>>,

    /// Nominal frame spacing
    frame_interval: Duration,

    /// Relative jitter per frame, if any
    jitter: Option<Normal<f64>>,

    /// Frames delivered so far
    frames: Arc<AtomicU64>,
}

impl SimContext {
    /// Creates a new SimContext at 60 Hz without jitter.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            frame_interval: Duration::from_secs(1) / 60,
            jitter: None,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Sets the nominal frame rate.
    pub fn with_frame_rate(mut self, hz: u32) -> Result<Self, EnvError> {
        if hz == 0 || hz > 1000 {
            return Err(EnvError::InvalidFrameRate(hz));
        }
        self.frame_interval = Duration::from_secs(1) / hz;
        Ok(self)
    }

    /// Adds Gaussian frame-interval jitter with the given relative standard
    /// deviation. Samples are clipped to ±25% of the nominal interval.
    pub fn with_jitter(mut self, std_dev_fraction: f64) -> Result<Self, EnvError> {
        if !(std_dev_fraction.is_finite() && std_dev_fraction >= 0.0) {
            return Err(EnvError::context(format!(
                "invalid jitter: {}",
                std_dev_fraction
            )));
        }
        let normal = Normal::new(0.0, std_dev_fraction)
            .map_err(|e| EnvError::context(format!("invalid jitter: {}", e)))?;
        self.jitter = Some(normal);
        Ok(self)
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap();
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap()
    }

    /// Number of frames delivered so far.
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn next_interval(&self) -> Duration {
        let Some(normal) = &self.jitter else {
            return self.frame_interval;
        };
        let offset = {
            let mut rng = self.rng.lock().unwrap();
            normal.sample(&mut *rng)
        };
        let factor = 1.0 + offset.clamp(-MAX_JITTER_FRACTION, MAX_JITTER_FRACTION);
        self.frame_interval.mul_f64(factor)
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            rng: Arc::clone(&self.rng),
            frame_interval: self.frame_interval,
            jitter: self.jitter,
            frames: Arc::clone(&self.frames),
        }
    }
}

#[async_trait]
impl AnimationContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(*self.virtual_time_ns.lock().unwrap())
    }

    async fn next_frame(&self) -> Duration {
        self.advance_time(self.next_interval());
        self.frames.fetch_add(1, Ordering::Relaxed);
        tokio::task::yield_now().await;
        self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_frames_advance_by_interval() {
        let ctx = SimContext::new(42).with_frame_rate(50).unwrap();
        assert_eq!(ctx.next_frame().await, Duration::from_millis(20));
        assert_eq!(ctx.next_frame().await, Duration::from_millis(40));
        assert_eq!(ctx.frame_count(), 2);
    }

    #[tokio::test]
    async fn test_jitter_is_deterministic_and_bounded() {
        let a = SimContext::new(7).with_jitter(0.5).unwrap();
        let b = SimContext::new(7).with_jitter(0.5).unwrap();
        let nominal = a.frame_interval().as_secs_f64();

        let mut last = Duration::ZERO;
        for _ in 0..200 {
            let ta = a.next_frame().await;
            let tb = b.next_frame().await;
            assert_eq!(ta, tb);

            let step = (ta - last).as_secs_f64();
            assert!(step >= nominal * 0.75 - 1e-9 && step <= nominal * 1.25 + 1e-9);
            last = ta;
        }
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(SimContext::new(1).with_frame_rate(0).is_err());
        assert!(SimContext::new(1).with_jitter(-1.0).is_err());
        assert!(SimContext::new(1).with_jitter(f64::NAN).is_err());
        assert!(SimContext::new(1).with_jitter(f64::INFINITY).is_err());
        assert!(SimContext::new(1).with_jitter(0.0).is_ok());
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        assert_eq!(ctx1.now(), ctx2.now());
    }
}
