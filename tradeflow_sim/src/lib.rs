//! Tradeflow Deterministic Simulation Harness
//!
//! Runs the route sequence controller against a virtual clock so that whole
//! sequences, including teardown at arbitrary points, replay identically
//! for a given seed.
//!
//! # Core Principle: Time Only Moves When the Engine Waits
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: the virtual clock advances inside `next_frame`/`sleep` only
//! - **Frame pacing**: optional Gaussian jitter from a seeded ChaCha8 RNG
//! - **Cancellation**: watchers joined with the run fire at exact virtual
//!   times, between two frames
//!
//! # Usage
//!
//! ```ignore
//! use tradeflow_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::CancelMidArc);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{CaptureScene, Position, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
