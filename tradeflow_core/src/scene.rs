//! Render sink for the engine.
//!
//! Scene setup (globe, lights, polygons) belongs to the host. The engine
//! only pushes camera poses, the live arc buffer, the direction indicator
//! and baked trails through [`Scene`].

use crate::camera::CameraPlacement;
use nalgebra::{Isometry3, Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Colour (0xRRGGBB) and opacity of baked trails.
pub const TRAIL_COLOR: u32 = 0xff8800;
pub const TRAIL_OPACITY: f32 = 0.18;

/// Full camera transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Placement this pose was derived from
    pub placement: CameraPlacement,
    /// Eye position in scene space
    pub eye: Point3<f64>,
    /// World-to-camera transform looking at the globe centre
    pub view: Isometry3<f64>,
}

/// Position, orientation and size of the direction indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPose {
    pub position: Point3<f32>,
    /// Maps the indicator's local frame into scene space: x = right,
    /// y = direction of travel, z = outward normal. The indicator shape is
    /// drawn in its local XY plane pointing along +y.
    pub rotation: UnitQuaternion<f32>,
    pub scale: f32,
}

impl Default for IndicatorPose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
            scale: 1.0,
        }
    }
}

/// A permanent, dim record of a completed arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub points: Vec<Point3<f32>>,
    pub color: u32,
    pub opacity: f32,
}

/// Sink for everything the engine draws.
pub trait Scene {
    /// Moves the camera.
    fn set_camera(&mut self, pose: &CameraPose);

    /// Publishes the live arc buffer. Only the first `visible` points are
    /// meaningful; `shown` toggles the line as a whole.
    fn sync_live_arc(&mut self, points: &[Point3<f32>], visible: usize, shown: bool);

    /// Publishes the direction indicator.
    fn sync_indicator(&mut self, pose: &IndicatorPose, shown: bool);

    /// Adds a permanent trail. The scene owns it from here on.
    fn add_trail(&mut self, trail: Trail);

    /// Enables or disables the host's free-roam camera controls.
    fn set_free_roam(&mut self, enabled: bool);
}

/// Scene that records what it is told, for tests and simulation.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    /// Number of `set_camera` calls
    pub camera_updates: usize,
    /// Most recent camera pose
    pub last_camera: Option<CameraPose>,
    /// Number of `sync_live_arc` calls
    pub arc_syncs: usize,
    /// Visible point count of the last arc sync
    pub visible: usize,
    /// Whether the live arc is currently shown
    pub arc_shown: bool,
    /// Last point of the visible range at the last arc sync
    pub last_tip: Option<Point3<f32>>,
    /// Most recent indicator pose
    pub indicator: Option<IndicatorPose>,
    /// Whether the indicator is currently shown
    pub indicator_shown: bool,
    /// Baked trails in creation order
    pub trails: Vec<Trail>,
    /// Whether free-roam controls are enabled
    pub free_roam: bool,
    /// Largest angle (radians) seen between the camera's radial direction
    /// and the shown arc tip's radial direction
    pub max_tip_drift: f64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            free_roam: true,
            ..Default::default()
        }
    }
}

impl Scene for HeadlessScene {
    fn set_camera(&mut self, pose: &CameraPose) {
        self.camera_updates += 1;
        self.last_camera = Some(*pose);

        if let (true, Some(tip)) = (self.arc_shown, self.last_tip) {
            let tip = tip.coords.cast::<f64>();
            let eye = pose.eye.coords;
            if tip.norm() > 0.0 && eye.norm() > 0.0 {
                let drift = tip.normalize().dot(&eye.normalize()).clamp(-1.0, 1.0).acos();
                self.max_tip_drift = self.max_tip_drift.max(drift);
            }
        }
    }

    fn sync_live_arc(&mut self, points: &[Point3<f32>], visible: usize, shown: bool) {
        self.arc_syncs += 1;
        self.visible = visible;
        self.arc_shown = shown;
        self.last_tip = visible.checked_sub(1).and_then(|i| points.get(i)).copied();
    }

    fn sync_indicator(&mut self, pose: &IndicatorPose, shown: bool) {
        self.indicator = Some(*pose);
        self.indicator_shown = shown;
    }

    fn add_trail(&mut self, trail: Trail) {
        self.trails.push(trail);
    }

    fn set_free_roam(&mut self, enabled: bool) {
        self.free_roam = enabled;
    }
}
