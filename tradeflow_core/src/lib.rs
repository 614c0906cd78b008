//! Tradeflow Core - Sequenced Route Animation Engine
//!
//! Flies a camera along a list of trade-route stops on a 3-D globe, drawing
//! each leg as a great-circle arc that rises off the surface:
//! 1. **Spherical math**: one axis convention, slerp with degenerate-case
//!    fallbacks, easing and arc height profiles
//! 2. **Arc rendering**: precomputed samples revealed into a fixed buffer
//!    frame by frame, with a direction indicator and baked trails
//! 3. **Camera choreography**: timed transitions and exact arc-tip tracking
//! 4. **Sequencing**: a cancellable `LOADING → READY → RUNNING → DONE`
//!    state machine driving the above
//!
//! Time and cancellation come from `tradeflow_env`, so the same controller
//! runs against tokio in production and a virtual clock in simulation.

pub mod arc_path;
pub mod arc_renderer;
pub mod camera;
pub mod config;
pub mod error;
pub mod observer;
pub mod resolver;
pub mod route;
pub mod scene;
pub mod sequence;
pub mod sphere;

// Re-export key types for convenience
pub use arc_path::{ArcPathBuilder, ArcSample};
pub use arc_renderer::IncrementalArcRenderer;
pub use camera::{pose_for, CameraChoreographer, CameraPlacement};
pub use config::ChoreographyConfig;
pub use error::{ConfigError, DataError, SequenceError};
pub use observer::{NullObserver, RecordingObserver, SequenceEvent, SequenceObserver};
pub use resolver::{
    CentroidResolver, LocationResolver, LocationSource, ResolvedLocation, StaticGazetteer,
};
pub use route::{load_route_file, order_exporters_first, parse_route_json, Role, RouteStep};
pub use scene::{CameraPose, HeadlessScene, IndicatorPose, Scene, Trail};
pub use sequence::{
    DataQualityIssue, ResolvedStop, RunOutcome, SequenceController, SequenceHandle, SequencePhase,
};
pub use sphere::{
    altitude_to_distance, arc_altitude, ease_in_out, slerp, to_cartesian, GeoPoint, GLOBE_RADIUS,
};
