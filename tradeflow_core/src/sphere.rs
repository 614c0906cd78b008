//! Spherical math shared by the arc builder and the camera.
//!
//! # Axis convention
//!
//! Y-up, right-handed. Longitude rotates around +Y, with `(0°, 0°)` on +Z
//! and `(0°, 90°E)` on +X:
//!
//! ```text
//! x = r · cos(lat) · sin(lng)
//! y = r · sin(lat)
//! z = r · cos(lat) · cos(lng)
//! ```
//!
//! [`to_cartesian`] is the only place this mapping is written down. Arc
//! points, camera placement and slerp all go through it (or its inverse),
//! so the camera can never disagree with the arc tip about where a
//! coordinate lives.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Radius of the rendered globe in scene units.
pub const GLOBE_RADIUS: f64 = 100.0;

/// Angular separations below this are treated as coincident (radians).
pub const COINCIDENT_EPSILON: f64 = 1e-7;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
    /// Longitude in degrees, [-180, 180]
    pub lng: f64,
}

impl GeoPoint {
    /// The `(0, 0)` point. Also what resolvers hand back for unknown names.
    pub const ORIGIN: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    /// Creates a point, clamping latitude and wrapping longitude into range.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lng: wrap_lng(lng),
        }
    }

    /// Unit vector pointing at this coordinate.
    pub fn unit_vector(&self) -> Vector3<f64> {
        to_cartesian(*self, 0.0) / GLOBE_RADIUS
    }

    /// Inverse of [`unit_vector`](Self::unit_vector). The input need not be
    /// normalised; a zero vector maps to [`GeoPoint::ORIGIN`].
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        let norm = v.norm();
        if norm < f64::EPSILON {
            return Self::ORIGIN;
        }
        let u = v / norm;
        Self {
            lat: u.y.clamp(-1.0, 1.0).asin().to_degrees(),
            lng: u.x.atan2(u.z).to_degrees(),
        }
    }

    /// Great-circle angle to `other` in radians.
    pub fn angle_to(&self, other: &GeoPoint) -> f64 {
        clamped_angle(&self.unit_vector(), &other.unit_vector())
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.lat, self.lng)
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Maps a coordinate plus altitude (in globe radii above the surface) to a
/// scene-space position on a sphere of radius `GLOBE_RADIUS · (1 + altitude)`.
pub fn to_cartesian(point: GeoPoint, altitude: f64) -> Vector3<f64> {
    let r = GLOBE_RADIUS * (1.0 + altitude);
    let phi = point.lat.to_radians();
    let lambda = point.lng.to_radians();
    Vector3::new(
        r * phi.cos() * lambda.sin(),
        r * phi.sin(),
        r * phi.cos() * lambda.cos(),
    )
}

/// Angle between two unit vectors, with the dot product clamped so
/// floating-point overshoot never reaches `acos` outside its domain.
fn clamped_angle(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Any unit vector perpendicular to `v` (which must be non-zero).
///
/// Deterministic: crosses with whichever world axis is least aligned
/// with `v`.
pub fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let a = v.abs();
    let axis = if a.x <= a.y && a.x <= a.z {
        Vector3::x()
    } else if a.y <= a.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    v.cross(&axis).normalize()
}

/// Spherical linear interpolation along the great circle from `a` to `b`.
///
/// - `t` is clamped to `[0, 1]`; the endpoints are returned verbatim.
/// - Coincident points return `a`.
/// - Antipodal points have no unique great circle; the path then runs
///   through a fixed perpendicular of `a` so the result is still
///   deterministic.
pub fn slerp(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let va = a.unit_vector();
    let vb = b.unit_vector();
    let omega = clamped_angle(&va, &vb);
    if omega < COINCIDENT_EPSILON {
        return a;
    }

    let sin_omega = omega.sin();
    let v = if sin_omega < COINCIDENT_EPSILON {
        // Antipodal: rotate half a turn around an arbitrary axis.
        let side = any_perpendicular(&va);
        va * (t * PI).cos() + side * (t * PI).sin()
    } else {
        let fa = ((1.0 - t) * omega).sin() / sin_omega;
        let fb = (t * omega).sin() / sin_omega;
        va * fa + vb * fb
    };
    GeoPoint::from_vector(&v)
}

/// Quadratic ease-in-out on `[0, 1]`.
///
/// Arc traversal and camera transitions both use this curve so their
/// visual speeds match.
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Altitude profile of an arc: zero at both ends, `peak` at the midpoint.
pub fn arc_altitude(t: f64, peak: f64) -> f64 {
    (t * PI).sin() * peak
}

/// Converts an altitude in globe radii to a distance from the globe centre.
pub fn altitude_to_distance(altitude: f64) -> f64 {
    GLOBE_RADIUS * (1.0 + altitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn valid_point() -> impl Strategy<Value = GeoPoint> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| GeoPoint { lat, lng })
    }

    #[test]
    fn test_axis_convention() {
        let equator_prime = to_cartesian(GeoPoint::new(0.0, 0.0), 0.0);
        assert_relative_eq!(equator_prime, Vector3::new(0.0, 0.0, GLOBE_RADIUS), epsilon = 1e-9);

        let equator_east = to_cartesian(GeoPoint::new(0.0, 90.0), 0.0);
        assert_relative_eq!(equator_east, Vector3::new(GLOBE_RADIUS, 0.0, 0.0), epsilon = 1e-9);

        let north_pole = to_cartesian(GeoPoint::new(90.0, 0.0), 1.0);
        assert_relative_eq!(north_pole, Vector3::new(0.0, 2.0 * GLOBE_RADIUS, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_from_vector_inverts_to_cartesian() {
        let p = GeoPoint::new(35.0, 104.0);
        let back = GeoPoint::from_vector(&to_cartesian(p, 0.4));
        assert_relative_eq!(back.lat, p.lat, epsilon = 1e-9);
        assert_relative_eq!(back.lng, p.lng, epsilon = 1e-9);
    }

    #[test]
    fn test_new_wraps_and_clamps() {
        let p = GeoPoint::new(95.0, 190.0);
        assert_eq!(p.lat, 90.0);
        assert_relative_eq!(p.lng, -170.0, epsilon = 1e-9);
        assert_eq!(GeoPoint::new(0.0, 540.0).lng, 180.0);
    }

    #[test]
    fn test_slerp_midpoint_on_equator() {
        let mid = slerp(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 90.0), 0.5);
        assert_relative_eq!(mid.lat, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mid.lng, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_crosses_antimeridian_the_short_way() {
        let mid = slerp(GeoPoint::new(0.0, 170.0), GeoPoint::new(0.0, -170.0), 0.5);
        assert_relative_eq!(mid.lng.abs(), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_antipodal_is_finite_and_deterministic() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        let mid1 = slerp(a, b, 0.5);
        let mid2 = slerp(a, b, 0.5);

        assert!(mid1.lat.is_finite() && mid1.lng.is_finite());
        assert_eq!(mid1, mid2);
        // Half way round is a quarter turn from both ends.
        assert_relative_eq!(mid1.angle_to(&a), PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_slerp_through_pole() {
        let mid = slerp(GeoPoint::new(60.0, 0.0), GeoPoint::new(60.0, 180.0), 0.5);
        assert_relative_eq!(mid.lat, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_arc_altitude_profile() {
        assert_relative_eq!(arc_altitude(0.0, 0.32), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc_altitude(1.0, 0.32), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc_altitude(0.5, 0.32), 0.32, epsilon = 1e-12);
    }

    #[test]
    fn test_ease_in_out_shape() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_relative_eq!(ease_in_out(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(ease_in_out(1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(ease_in_out(0.25), 0.125, epsilon = 1e-12);
        assert_relative_eq!(ease_in_out(0.75), 0.875, epsilon = 1e-12);
    }

    #[test]
    fn test_any_perpendicular() {
        for v in [Vector3::x(), Vector3::y(), Vector3::new(1.0, 2.0, -3.0)] {
            let p = any_perpendicular(&v);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(p.dot(&v), 0.0, epsilon = 1e-12);
        }
    }

    proptest! {
        #[test]
        fn prop_slerp_identical_points(a in valid_point(), t in 0.0f64..=1.0) {
            prop_assert_eq!(slerp(a, a, t), a);
        }

        #[test]
        fn prop_slerp_endpoints(a in valid_point(), b in valid_point()) {
            prop_assert_eq!(slerp(a, b, 0.0), a);
            prop_assert_eq!(slerp(a, b, 1.0), b);
        }

        #[test]
        fn prop_slerp_stays_on_great_circle(a in valid_point(), b in valid_point(), t in 0.0f64..=1.0) {
            let omega = a.angle_to(&b);
            prop_assume!(omega > 1e-3 && omega < PI - 1e-3);
            let p = slerp(a, b, t);
            prop_assert!((p.angle_to(&a) - t * omega).abs() < 1e-6);
            prop_assert!((p.angle_to(&b) - (1.0 - t) * omega).abs() < 1e-6);
        }

        #[test]
        fn prop_ease_is_monotonic(x in 0.0f64..1.0, dx in 0.0f64..0.1) {
            prop_assert!(ease_in_out(x + dx) >= ease_in_out(x));
        }
    }
}
