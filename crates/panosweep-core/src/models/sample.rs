use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a persisted sample point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId(pub i64);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<geo::Coord<f64>> for LatLon {
    /// Planar coordinates are (x = longitude, y = latitude).
    fn from(coord: geo::Coord<f64>) -> Self {
        Self { lat: coord.y, lon: coord.x }
    }
}

/// A candidate coordinate in the persistent work queue.
///
/// `lat`, `lon` and `label` never change once stored; only `searched` flips,
/// and only from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub id: SampleId,
    pub lat: f64,
    pub lon: f64,
    /// Region the point was sampled from
    pub label: String,
    pub searched: bool,
}

impl SamplePoint {
    pub fn coordinate(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Opaque token identifying the worker that holds a claim on sample points
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimToken(pub String);

impl ClaimToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Searched/total counts for one region label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelProgress {
    pub label: String,
    pub total: u64,
    pub searched: u64,
}

impl LabelProgress {
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.searched)
    }
}
