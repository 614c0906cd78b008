//! Camera choreography: placement, timed transitions and arc-tip tracking.

use crate::arc_path::ArcSample;
use crate::scene::{CameraPose, Scene};
use crate::sphere::{altitude_to_distance, ease_in_out, slerp, GeoPoint, GLOBE_RADIUS};
use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use tradeflow_env::{AnimationContext, CancelScope, Flow};

/// Where the camera is: above `point`, `distance` from the globe centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPlacement {
    pub point: GeoPoint,
    /// Radial distance from the globe centre, never below the globe radius
    pub distance: f64,
}

impl CameraPlacement {
    /// Creates a placement. Distances inside the globe are raised to the
    /// surface.
    pub fn new(point: GeoPoint, distance: f64) -> Self {
        Self {
            point,
            distance: distance.max(GLOBE_RADIUS),
        }
    }

    /// Creates a placement `altitude` globe radii above the surface.
    pub fn at_altitude(point: GeoPoint, altitude: f64) -> Self {
        Self::new(point, altitude_to_distance(altitude))
    }

    /// Height above the surface in globe radii.
    pub fn altitude(&self) -> f64 {
        self.distance / GLOBE_RADIUS - 1.0
    }

    /// Great-circle interpolation of the position, linear interpolation of
    /// the distance. `t` is used as given (callers apply easing).
    pub fn interpolate(&self, other: &CameraPlacement, t: f64) -> CameraPlacement {
        CameraPlacement::new(
            slerp(self.point, other.point, t),
            self.distance + (other.distance - self.distance) * t,
        )
    }
}

/// Camera pose for a placement: eye on the ray through `point`, looking
/// at the globe centre. Pure.
pub fn pose_for(placement: CameraPlacement) -> CameraPose {
    let dir = placement.point.unit_vector();
    let eye = Point3::from(dir * placement.distance);
    // Y-up everywhere except straight above a pole
    let up = if dir.y.abs() > 0.999 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    CameraPose {
        placement,
        eye,
        view: Isometry3::look_at_rh(&eye, &Point3::origin(), &up),
    }
}

/// Drives the scene camera.
#[derive(Debug, Clone)]
pub struct CameraChoreographer {
    /// Altitude of the camera above an arc tip sitting on the surface
    track_base_altitude: f64,

    /// Extra camera altitude per unit of tip altitude
    track_altitude_gain: f64,

    /// Last placement pushed to the scene
    last: Option<CameraPlacement>,
}

impl CameraChoreographer {
    pub fn new(track_base_altitude: f64, track_altitude_gain: f64) -> Self {
        Self {
            track_base_altitude,
            track_altitude_gain,
            last: None,
        }
    }

    /// Last placement pushed to the scene, if any.
    pub fn last_placement(&self) -> Option<CameraPlacement> {
        self.last
    }

    /// Places the camera above `point` at `distance` from the centre.
    pub fn place<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        point: GeoPoint,
        distance: f64,
    ) -> CameraPose {
        self.apply(scene, CameraPlacement::new(point, distance))
    }

    fn apply<S: Scene + ?Sized>(&mut self, scene: &mut S, placement: CameraPlacement) -> CameraPose {
        let pose = pose_for(placement);
        scene.set_camera(&pose);
        self.last = Some(placement);
        pose
    }

    /// Placement used while an arc is drawn: directly above the tip.
    pub fn tip_placement(&self, sample: &ArcSample) -> CameraPlacement {
        CameraPlacement::at_altitude(
            sample.point,
            self.track_base_altitude + sample.altitude * self.track_altitude_gain,
        )
    }

    /// Places the camera directly above the arc tip. Called once per frame
    /// with the same sample that was just revealed.
    pub fn track_arc_tip<S: Scene + ?Sized>(&mut self, scene: &mut S, sample: &ArcSample) -> CameraPose {
        let placement = self.tip_placement(sample);
        self.apply(scene, placement)
    }

    /// Animates the camera from `from` to `to` over `duration`.
    ///
    /// Each frame eases the elapsed fraction, slerps the position and
    /// lerps the distance. Returns `Flow::Cancelled` as soon as the scope
    /// is cancelled; the target placement is then generally not reached.
    pub async fn transition<C, S>(
        &mut self,
        ctx: &C,
        scope: &CancelScope,
        scene: &mut S,
        from: CameraPlacement,
        to: CameraPlacement,
        duration: Duration,
    ) -> Flow
    where
        C: AnimationContext + ?Sized,
        S: Scene + ?Sized,
    {
        debug!(
            "Camera transition {} -> {} over {}ms",
            from.point,
            to.point,
            duration.as_millis()
        );
        let total = duration.as_secs_f64();
        let mut start = None;
        loop {
            let Some(now) = scope.next_frame(ctx).await else {
                return Flow::Cancelled;
            };
            let t0 = *start.get_or_insert(now);
            let raw = if total > 0.0 {
                (now.saturating_sub(t0).as_secs_f64() / total).min(1.0)
            } else {
                1.0
            };
            self.apply(scene, from.interpolate(&to, ease_in_out(raw)));
            if raw >= 1.0 {
                return Flow::Continue;
            }
        }
    }
}
