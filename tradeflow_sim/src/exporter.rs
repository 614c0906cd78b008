//! JSON export of simulated runs.
//!
//! [`CaptureScene`] sits between the controller and a [`HeadlessScene`],
//! stamping camera updates with virtual time so a run can be replayed or
//! plotted offline.

use crate::context::SimContext;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use tradeflow_core::scene::{CameraPose, HeadlessScene, IndicatorPose, Scene, Trail};
use tradeflow_core::SequenceEvent;
use tradeflow_env::AnimationContext;

/// A scene-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn from_point(p: &Point3<f64>) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }

    pub fn from_point_f32(p: &Point3<f32>) -> Self {
        Self::from_point(&p.cast::<f64>())
    }
}

/// One sampled camera update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Virtual time in seconds
    pub time_sec: f64,

    /// Camera eye
    pub camera: Position,

    /// Live arc tip, if an arc was shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<Position>,

    /// Visible live arc points
    pub visible: usize,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Sampled frames
    pub frames: Vec<SimFrame>,

    /// Notifications in order
    pub events: Vec<SequenceEvent>,

    /// Number of baked trails
    pub trails: usize,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            events: Vec::new(),
            trails: 0,
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Scene wrapper that records timestamped frames.
pub struct CaptureScene {
    /// Underlying recorder
    pub inner: HeadlessScene,

    /// Camera updates seen so far
    camera_calls: usize,

    /// Record every n-th camera update
    sample_every: usize,

    /// Camera or indicator updates with non-finite values
    pub non_finite: usize,

    ctx: Arc<SimContext>,

    frames: Vec<SimFrame>,
}

impl CaptureScene {
    pub fn new(ctx: Arc<SimContext>, sample_every: usize) -> Self {
        Self {
            inner: HeadlessScene::new(),
            camera_calls: 0,
            sample_every: sample_every.max(1),
            non_finite: 0,
            ctx,
            frames: Vec::new(),
        }
    }

    /// Recorded frames.
    pub fn frames(&self) -> &[SimFrame] {
        &self.frames
    }

    /// Moves the recorded frames into `export`.
    pub fn drain_into(&mut self, export: &mut SimExport) {
        for frame in self.frames.drain(..) {
            export.add_frame(frame);
        }
        export.trails = self.inner.trails.len();
    }
}

impl Scene for CaptureScene {
    fn set_camera(&mut self, pose: &CameraPose) {
        if !pose.eye.coords.iter().all(|c| c.is_finite())
            || !pose.view.rotation.coords.iter().all(|c| c.is_finite())
        {
            self.non_finite += 1;
        }
        self.inner.set_camera(pose);

        if self.camera_calls % self.sample_every == 0 {
            self.frames.push(SimFrame {
                time_sec: self.ctx.now().as_secs_f64(),
                camera: Position::from_point(&pose.eye),
                tip: self
                    .inner
                    .arc_shown
                    .then_some(self.inner.last_tip)
                    .flatten()
                    .map(|p| Position::from_point_f32(&p)),
                visible: self.inner.visible,
            });
        }
        self.camera_calls += 1;
    }

    fn sync_live_arc(&mut self, points: &[Point3<f32>], visible: usize, shown: bool) {
        self.inner.sync_live_arc(points, visible, shown);
    }

    fn sync_indicator(&mut self, pose: &IndicatorPose, shown: bool) {
        if shown && !pose.rotation.coords.iter().all(|c| c.is_finite()) {
            self.non_finite += 1;
        }
        self.inner.sync_indicator(pose, shown);
    }

    fn add_trail(&mut self, trail: Trail) {
        self.inner.add_trail(trail);
    }

    fn set_free_roam(&mut self, enabled: bool) {
        self.inner.set_free_roam(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow_core::{pose_for, CameraPlacement, GeoPoint};

    #[test]
    fn test_capture_samples_camera_updates() {
        let ctx = SimContext::shared(1);
        let mut scene = CaptureScene::new(Arc::clone(&ctx), 2);
        let pose = pose_for(CameraPlacement::at_altitude(GeoPoint::new(10.0, 20.0), 1.5));

        for _ in 0..5 {
            ctx.advance_time(std::time::Duration::from_millis(10));
            scene.set_camera(&pose);
        }

        assert_eq!(scene.inner.camera_updates, 5);
        assert_eq!(scene.frames().len(), 3);
        assert!((scene.frames()[1].time_sec - 0.03).abs() < 1e-9);
        assert_eq!(scene.non_finite, 0);

        let mut export = SimExport::new("full_route", 1);
        scene.drain_into(&mut export);
        assert_eq!(export.frames.len(), 3);
        assert!((export.duration_sec - 0.05).abs() < 1e-9);
    }
}
