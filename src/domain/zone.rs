//! Proximity zones and distance ranking

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::geo::{distance_m, Coordinate};

/// Zone identifier assigned by the zone directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A circular geofence tied to a physical location of interest.
/// Owned by the zone directory; read-only to the engine. The engine must
/// tolerate zones appearing, disappearing, or changing radius between
/// directory refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    /// Free-form tag, e.g. "showroom" or "lot"
    pub kind: String,
    pub center: Coordinate,
    pub radius_m: f64,
    pub active: bool,
}

/// Distance from a location to one zone. Recomputed on every sample,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneDistance {
    pub zone: Zone,
    pub distance_m: f64,
    pub inside_radius: bool,
}

/// Rank active zones by distance from `location`, nearest first.
///
/// Inactive zones are excluded entirely. Ties break by ascending zone id so
/// the ordering is deterministic. An empty zone set yields an empty list.
pub fn rank(location: &Coordinate, zones: &[Zone]) -> Vec<ZoneDistance> {
    let mut ranked: Vec<ZoneDistance> = zones
        .iter()
        .filter(|z| z.active)
        .map(|z| {
            let d = distance_m(location, &z.center);
            ZoneDistance {
                distance_m: d,
                inside_radius: d <= z.radius_m,
                zone: z.clone(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_m
            .partial_cmp(&b.distance_m)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.zone.id.cmp(&b.zone.id))
    });

    ranked
}
