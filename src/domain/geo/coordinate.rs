//! Coordinate value object

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error when a coordinate is outside the valid WGS84 range
#[derive(Debug, Clone, Error)]
#[error("Invalid coordinate: latitude {latitude}, longitude {longitude} (expected lat in [-90, 90], lon in [-180, 180])")]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Value object representing one position sample.
/// Produced by the location stream; immutable; superseded by the next sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (WGS84)
    pub latitude: f64,
    /// Longitude in degrees (WGS84)
    pub longitude: f64,
    /// Estimated horizontal accuracy in meters
    pub accuracy_m: f64,
    /// Capture time as epoch milliseconds
    pub captured_at_ms: u64,
}

impl Coordinate {
    /// Create a coordinate, failing fast on out-of-range latitude/longitude
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: f64,
        captured_at_ms: u64,
    ) -> Result<Self, InvalidCoordinate> {
        if !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
            || !latitude.is_finite()
            || !longitude.is_finite()
        {
            return Err(InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy_m,
            captured_at_ms,
        })
    }

    /// Create a coordinate without an accuracy estimate or timestamp.
    /// Used for zone centers, which are surveyed positions rather than samples.
    pub fn fixed(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        Self::new(latitude, longitude, 0.0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_coordinate() {
        let c = Coordinate::new(52.52, 13.405, 5.0, 1000).unwrap();
        assert_eq!(c.latitude, 52.52);
        assert_eq!(c.longitude, 13.405);
        assert_eq!(c.accuracy_m, 5.0);
    }

    #[test]
    fn latitude_out_of_range_fails() {
        assert!(Coordinate::new(90.01, 0.0, 1.0, 0).is_err());
        assert!(Coordinate::new(-90.01, 0.0, 1.0, 0).is_err());
    }

    #[test]
    fn longitude_out_of_range_fails() {
        assert!(Coordinate::new(0.0, 180.01, 1.0, 0).is_err());
        assert!(Coordinate::new(0.0, -180.01, 1.0, 0).is_err());
    }

    #[test]
    fn boundary_values_are_valid() {
        assert!(Coordinate::new(90.0, 180.0, 1.0, 0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0, 1.0, 0).is_ok());
    }

    #[test]
    fn non_finite_fails() {
        assert!(Coordinate::new(f64::NAN, 0.0, 1.0, 0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY, 1.0, 0).is_err());
    }

    #[test]
    fn error_display_includes_values() {
        let err = Coordinate::new(100.0, 0.0, 1.0, 0).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("100"));
    }
}
