//! Error taxonomy for the sequence engine.
//!
//! Only configuration problems and misuse of the controller are errors.
//! Degenerate geometry is handled with fallback values and cancellation
//! resolves as a normal outcome, so neither appears here.

use crate::sequence::SequencePhase;
use thiserror::Error;

/// Configuration errors. Always reported before any animation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Arc sample count must be at least 1")]
    ZeroSamples,

    #[error("Arc of {requested} segments does not fit a buffer of {capacity} points")]
    SampleCountExceedsCapacity { requested: usize, capacity: usize },

    #[error("Route needs at least 2 stops, got {len}")]
    RouteTooShort { len: usize },

    #[error("Duration `{name}` must be positive")]
    NonPositiveDuration { name: &'static str },

    #[error("Invalid tuning value `{name}`: {value}")]
    InvalidValue { name: &'static str, value: f64 },
}

/// Errors returned by the sequence controller.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sequence is not ready (phase: {phase})")]
    NotReady { phase: SequencePhase },

    #[error("A sequence run is already in progress")]
    AlreadyRunning,

    #[error("Sequence was torn down; reset it before reuse")]
    TornDown,

    #[error("Sequence already finished; reset it before reuse")]
    Finished,
}

/// Errors loading route or boundary data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
