//! Tuning for a route sequence.
//!
//! None of these values affect correctness; they only shape how the flight
//! looks. They are validated up front so a bad value surfaces as a
//! configuration error instead of a broken animation.

use crate::arc_path::ArcPathBuilder;
use crate::camera::CameraPlacement;
use crate::error::{ConfigError, DataError};
use crate::sphere::GeoPoint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Highest frame rate a context accepts.
pub const MAX_FRAME_RATE_HZ: u32 = 1000;

/// Configuration for a route sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyConfig {
    /// Time to draw one arc (ms)
    pub arc_duration_ms: u64,

    /// Pause after each arrival (ms)
    pub dwell_ms: u64,

    /// Pause after the opening fly-in (ms)
    pub initial_dwell_ms: u64,

    /// Opening camera flight from the home view (ms)
    pub fly_in_ms: u64,

    /// Camera settle after each arrival (ms)
    pub settle_ms: u64,

    /// Live arc buffer size in points
    pub buffer_capacity: usize,

    /// Segments per live arc (points = segments + 1)
    pub arc_samples: usize,

    /// Segments per baked trail
    pub trail_samples: usize,

    /// Arc peak height in globe radii
    pub arc_peak: f64,

    /// Camera view before the sequence starts
    pub home_point: GeoPoint,

    /// Camera altitude of the home view (globe radii)
    pub home_altitude: f64,

    /// Camera altitude when parked over a stop (globe radii)
    pub cruise_altitude: f64,

    /// Camera altitude over an arc tip on the surface (globe radii)
    pub track_base_altitude: f64,

    /// Extra camera altitude per unit of tip altitude
    pub track_altitude_gain: f64,

    /// Direction indicator size as a fraction of the globe radius
    pub indicator_scale: f64,

    /// Labels are raised this many degrees of latitude above their stop
    pub label_lat_offset: f64,

    /// Frame rate of the animation clock (Hz)
    pub frame_rate_hz: u32,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            arc_duration_ms: 2600,
            dwell_ms: 4000,
            initial_dwell_ms: 800,
            fly_in_ms: 2200,
            settle_ms: 500,
            buffer_capacity: 200,
            arc_samples: 120,
            trail_samples: 80,
            arc_peak: 0.32,
            home_point: GeoPoint { lat: 20.0, lng: 10.0 },
            home_altitude: 2.5,
            cruise_altitude: 1.75,
            track_base_altitude: 1.5,
            track_altitude_gain: 2.6,
            indicator_scale: 0.028,
            label_lat_offset: 3.0,
            frame_rate_hz: 60,
        }
    }
}

impl ChoreographyConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks every value. Called before a run may start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ArcPathBuilder::new(self.buffer_capacity).check(self.arc_samples)?;
        if self.trail_samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }

        for (name, ms) in [
            ("arc_duration_ms", self.arc_duration_ms),
            ("fly_in_ms", self.fly_in_ms),
            ("settle_ms", self.settle_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::NonPositiveDuration { name });
            }
        }
        if self.frame_rate_hz == 0 || self.frame_rate_hz > MAX_FRAME_RATE_HZ {
            return Err(ConfigError::InvalidValue {
                name: "frame_rate_hz",
                value: f64::from(self.frame_rate_hz),
            });
        }

        for (name, value) in [
            ("arc_peak", self.arc_peak),
            ("home_altitude", self.home_altitude),
            ("cruise_altitude", self.cruise_altitude),
            ("track_base_altitude", self.track_base_altitude),
            ("track_altitude_gain", self.track_altitude_gain),
            ("indicator_scale", self.indicator_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        Ok(())
    }

    pub fn arc_duration(&self) -> Duration {
        Duration::from_millis(self.arc_duration_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn initial_dwell(&self) -> Duration {
        Duration::from_millis(self.initial_dwell_ms)
    }

    pub fn fly_in(&self) -> Duration {
        Duration::from_millis(self.fly_in_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Camera placement before the sequence starts.
    pub fn home_placement(&self) -> CameraPlacement {
        CameraPlacement::at_altitude(self.home_point, self.home_altitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChoreographyConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.arc_duration(), Duration::from_millis(2600));
    }

    #[test]
    fn test_oversized_arc_is_rejected() {
        let config = ChoreographyConfig {
            arc_samples: 200,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SampleCountExceedsCapacity {
                requested: 200,
                capacity: 200
            })
        );
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let config = ChoreographyConfig {
            settle_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveDuration { name: "settle_ms" })
        );
    }

    #[test]
    fn test_negative_peak_is_rejected() {
        let config = ChoreographyConfig {
            arc_peak: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "arc_peak", .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ChoreographyConfig =
            serde_json::from_str(r#"{ "arc_duration_ms": 1000, "arc_peak": 0.5 }"#).unwrap();
        assert_eq!(config.arc_duration_ms, 1000);
        assert_eq!(config.arc_peak, 0.5);
        assert_eq!(config.dwell_ms, 4000);
    }

    #[test]
    fn test_frame_rate_bounds() {
        for hz in [0, MAX_FRAME_RATE_HZ + 1] {
            let config = ChoreographyConfig {
                frame_rate_hz: hz,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidValue { name: "frame_rate_hz", .. })
            ));
        }
        let config = ChoreographyConfig {
            frame_rate_hz: MAX_FRAME_RATE_HZ,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
