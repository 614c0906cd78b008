//! Tradeflow Environment Abstraction Layer
//!
//! This crate provides the abstraction allowing the Tradeflow sequence engine
//! to run against both a **Production** clock (tokio) and a **Simulation**
//! clock (virtual time, deterministic).
//!
//! # Core Concept: Cooperative Scheduling
//!
//! A sequence run only ever suspends at two kinds of points:
//! - waiting for the next animation frame (`next_frame()`)
//! - waiting for a fixed delay (`sleep()`)
//!
//! Both are raced against the run's [`CancelScope`], so tearing a run down
//! resolves every parked wait at once and the awaiting code simply returns.
//!
//! # Example
//!
//! ```ignore
//! use tradeflow_env::{AnimationContext, CancelScope};
//!
//! async fn pulse<Ctx: AnimationContext>(ctx: &Ctx, scope: &CancelScope) {
//!     while let Some(stamp) = scope.next_frame(ctx).await {
//!         draw(stamp);
//!     }
//! }
//! ```

mod cancel;
mod context;
mod error;
mod tokio_impl;
mod types;

pub use cancel::{CancelScope, Flow};
pub use context::AnimationContext;
pub use error::EnvError;
pub use tokio_impl::{TokioContext, DEFAULT_FRAME_RATE_HZ};
pub use types::RunId;

pub use tokio_util::sync::CancellationToken;
