//! Ground distance to angular degrees.
//!
//! One degree is taken as 111 000 m on both axes. This ignores the shrinking
//! of longitude degrees away from the equator; the lookup service snaps to
//! panoramas within roughly 50 m anyway, so a 5 m lattice stays far denser
//! than needed even at high latitudes.

/// Approximate meters per degree of latitude (and, loosely, longitude)
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Default ground spacing between lattice points
pub const DEFAULT_SAMPLE_INTERVAL_METERS: f64 = 5.0;

/// Convert a ground distance to degrees using [`METERS_PER_DEGREE`]
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Inverse of [`meters_to_degrees`]
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}
