//! Incremental arc renderer.
//!
//! Owns one preallocated point buffer that is reused for every arc of a
//! run. Drawing an arc never recomputes geometry and never allocates: the
//! precomputed samples are copied into the buffer as they become visible
//! and the visible range only ever grows until the next `reset`.

use crate::arc_path::{sample_arc, ArcSample};
use crate::scene::{IndicatorPose, Scene, Trail, TRAIL_COLOR, TRAIL_OPACITY};
use crate::sphere::{any_perpendicular, GeoPoint, GLOBE_RADIUS};
use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};

const DIRECTION_EPSILON: f64 = 1e-9;

/// Fixed-capacity live arc plus its direction indicator.
#[derive(Debug)]
pub struct IncrementalArcRenderer {
    /// Point buffer, allocated once
    buffer: Box<[Point3<f32>]>,

    /// Number of leading buffer points that are visible
    visible: usize,

    /// Whether the live line is shown
    line_shown: bool,

    /// Current indicator pose
    indicator: IndicatorPose,

    /// Whether the indicator is shown
    indicator_shown: bool,

    /// Indicator edge length in scene units
    indicator_size: f32,

    /// Segments per baked trail
    trail_samples: usize,

    /// Number of trails baked since construction
    trails_baked: usize,
}

impl IncrementalArcRenderer {
    /// Creates a renderer with room for `capacity` points.
    ///
    /// # Arguments
    /// * `capacity` - Buffer size in points
    /// * `indicator_scale` - Indicator size as a fraction of the globe radius
    /// * `trail_samples` - Segments per baked trail
    pub fn new(capacity: usize, indicator_scale: f64, trail_samples: usize) -> Self {
        Self {
            buffer: vec![Point3::origin(); capacity].into_boxed_slice(),
            visible: 0,
            line_shown: false,
            indicator: IndicatorPose {
                scale: (GLOBE_RADIUS * indicator_scale) as f32,
                ..IndicatorPose::default()
            },
            indicator_shown: false,
            indicator_size: (GLOBE_RADIUS * indicator_scale) as f32,
            trail_samples: trail_samples.max(1),
            trails_baked: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of visible points.
    pub fn visible(&self) -> usize {
        self.visible
    }

    /// The visible prefix of the buffer.
    pub fn visible_points(&self) -> &[Point3<f32>] {
        &self.buffer[..self.visible]
    }

    pub fn is_shown(&self) -> bool {
        self.line_shown
    }

    pub fn indicator(&self) -> &IndicatorPose {
        &self.indicator
    }

    pub fn trails_baked(&self) -> usize {
        self.trails_baked
    }

    /// Zero visible points, line and indicator hidden.
    pub fn reset(&mut self) {
        self.visible = 0;
        self.line_shown = false;
        self.indicator_shown = false;
    }

    /// Resets and then shows the (still empty) line and the indicator,
    /// ready for a new arc.
    pub fn begin(&mut self) {
        self.reset();
        self.line_shown = true;
        self.indicator_shown = true;
    }

    /// Makes `samples[0..=index]` visible.
    ///
    /// Only the newly revealed samples are copied. A smaller `index` than
    /// already revealed is ignored, and `index` is clamped to the samples
    /// and the buffer. Returns the visible count afterwards.
    pub fn reveal_up_to(&mut self, samples: &[ArcSample], index: usize) -> usize {
        let limit = samples.len().min(self.buffer.len());
        if limit == 0 {
            return self.visible;
        }
        let target = index.min(limit - 1) + 1;
        if target <= self.visible {
            return self.visible;
        }
        for (slot, sample) in self.buffer[self.visible..target]
            .iter_mut()
            .zip(&samples[self.visible..target])
        {
            *slot = Point3::from(sample.position.cast::<f32>());
        }
        self.visible = target;
        self.visible
    }

    /// Orients the indicator at `tip`, pointing away from `prev`.
    ///
    /// When `tip` and `prev` coincide (the first frame of an arc) there is
    /// no direction of travel yet; a fixed tangent of the outward normal is
    /// used instead.
    pub fn place_indicator(&mut self, tip: &ArcSample, prev: &ArcSample) {
        let up = tip
            .position
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(Vector3::y);
        let forward = (tip.position - prev.position)
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(|| any_perpendicular(&up));
        // forward parallel to up has no right vector either
        let right = forward
            .cross(&up)
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(|| any_perpendicular(&up));
        let tangent = up.cross(&right);

        let basis = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[right, tangent, up]));
        self.indicator = IndicatorPose {
            position: Point3::from(tip.position.cast::<f32>()),
            rotation: UnitQuaternion::from_rotation_matrix(&basis).cast::<f32>(),
            scale: self.indicator_size,
        };
    }

    /// Emits a dim, permanent trail from `from` to `to` into `scene`.
    ///
    /// The trail has its own geometry and is independent of the live
    /// buffer.
    pub fn bake_trail<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        from: GeoPoint,
        to: GeoPoint,
        peak_altitude: f64,
    ) {
        let points = sample_arc(from, to, self.trail_samples, peak_altitude)
            .iter()
            .map(|s| Point3::from(s.position.cast::<f32>()))
            .collect();
        scene.add_trail(Trail {
            points,
            color: TRAIL_COLOR,
            opacity: TRAIL_OPACITY,
        });
        self.trails_baked += 1;
    }

    /// Pushes the live line and indicator state to `scene`.
    pub fn present<S: Scene + ?Sized>(&self, scene: &mut S) {
        scene.sync_live_arc(&self.buffer, self.visible, self.line_shown);
        scene.sync_indicator(&self.indicator, self.indicator_shown);
    }
}
