//! Precomputed arc geometry between two coordinates.

use crate::error::ConfigError;
use crate::sphere::{arc_altitude, slerp, to_cartesian, GeoPoint};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One precomputed point of an arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSample {
    /// Traversal parameter in [0, 1]
    pub t: f64,
    /// Surface coordinate under this sample
    pub point: GeoPoint,
    /// Height above the surface in globe radii
    pub altitude: f64,
    /// Scene-space position (see `sphere::to_cartesian`)
    pub position: Vector3<f64>,
}

/// Builds fixed-size arc sample sequences.
///
/// The builder is bound to the capacity of the buffer its output will be
/// revealed into, so an oversized request is rejected up front instead of
/// overrunning the buffer mid-animation.
#[derive(Debug, Clone, Copy)]
pub struct ArcPathBuilder {
    capacity: usize,
}

impl ArcPathBuilder {
    /// Creates a builder for a buffer holding `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Maximum number of points a built arc may contain.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks that `sample_count` segments fit the buffer.
    pub fn check(&self, sample_count: usize) -> Result<(), ConfigError> {
        if sample_count == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if sample_count + 1 > self.capacity {
            return Err(ConfigError::SampleCountExceedsCapacity {
                requested: sample_count,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Builds `sample_count + 1` samples from `from` to `to`, ordered by
    /// strictly increasing `t` from 0 to 1.
    ///
    /// Pure: identical inputs give identical samples.
    pub fn build(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        sample_count: usize,
        peak_altitude: f64,
    ) -> Result<Vec<ArcSample>, ConfigError> {
        self.check(sample_count)?;
        Ok(sample_arc(from, to, sample_count, peak_altitude))
    }
}

/// Samples an arc without a capacity bound. Used for baked trails, which
/// own their own geometry.
pub(crate) fn sample_arc(
    from: GeoPoint,
    to: GeoPoint,
    sample_count: usize,
    peak_altitude: f64,
) -> Vec<ArcSample> {
    let n = sample_count.max(1);
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let point = slerp(from, to, t);
            let altitude = arc_altitude(t, peak_altitude);
            ArcSample {
                t,
                point,
                altitude,
                position: to_cartesian(point, altitude),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::GLOBE_RADIUS;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const BEIJING: GeoPoint = GeoPoint { lat: 35.0, lng: 104.0 };
    const KANSAS: GeoPoint = GeoPoint { lat: 39.0, lng: -98.0 };

    #[test]
    fn test_build_endpoints_sit_on_surface() {
        let samples = ArcPathBuilder::new(200).build(BEIJING, KANSAS, 120, 0.32).unwrap();

        assert_eq!(samples.len(), 121);
        assert_eq!(samples[0].point, BEIJING);
        assert_eq!(samples[120].point, KANSAS);
        assert_relative_eq!(samples[0].position.norm(), GLOBE_RADIUS, epsilon = 1e-9);
        assert_relative_eq!(samples[120].position.norm(), GLOBE_RADIUS, epsilon = 1e-6);
    }

    #[test]
    fn test_build_peaks_at_midpoint() {
        let samples = ArcPathBuilder::new(200).build(BEIJING, KANSAS, 120, 0.32).unwrap();
        let mid = &samples[60];
        assert_relative_eq!(mid.altitude, 0.32, epsilon = 1e-12);
        assert_relative_eq!(mid.position.norm(), GLOBE_RADIUS * 1.32, epsilon = 1e-9);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ArcPathBuilder::new(200);
        let a = builder.build(BEIJING, KANSAS, 90, 0.2).unwrap();
        let b = builder.build(BEIJING, KANSAS, 90, 0.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_rejects_oversized_request() {
        let err = ArcPathBuilder::new(200).build(BEIJING, KANSAS, 200, 0.32).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SampleCountExceedsCapacity { requested: 200, capacity: 200 }
        ));
    }

    #[test]
    fn test_build_rejects_zero_samples() {
        let err = ArcPathBuilder::new(200).build(BEIJING, KANSAS, 0, 0.32).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSamples));
    }

    #[test]
    fn test_coincident_endpoints_hop_in_place() {
        let samples = ArcPathBuilder::new(16).build(BEIJING, BEIJING, 8, 0.32).unwrap();
        assert!(samples.iter().all(|s| s.point == BEIJING));
        assert_relative_eq!(samples[4].altitude, 0.32, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_sample_count_and_ordering(n in 1usize..199, lat in -89.0f64..89.0, lng in -180.0f64..180.0) {
            let samples = ArcPathBuilder::new(200)
                .build(GeoPoint::new(lat, lng), KANSAS, n, 0.32)
                .unwrap();
            prop_assert_eq!(samples.len(), n + 1);
            prop_assert_eq!(samples[0].t, 0.0);
            prop_assert_eq!(samples[n].t, 1.0);
            prop_assert!(samples.windows(2).all(|w| w[1].t > w[0].t));
        }
    }
}
