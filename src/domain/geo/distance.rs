//! Great-circle distance on a spherical Earth

use super::Coordinate;

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
///
/// Uses a spherical-Earth approximation, which is accurate to well under
/// 0.5% over the sub-kilometer ranges that zone geometry operates at.
/// Coordinates are validated at construction, so no error cases remain here.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
