use geo::algorithm::area::Area;
use geo::{LineString, Polygon};
use panosweep_core::error::{PanosweepError, Result};
use panosweep_core::models::Boundary;

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }
}

/// Validate a polygon before it is sampled
pub fn validate_polygon(polygon: &Polygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    validate_ring(polygon.exterior(), "exterior", &mut result);
    for (i, interior) in polygon.interiors().iter().enumerate() {
        validate_ring(interior, &format!("interior[{}]", i), &mut result);
    }

    let exterior_only = Polygon::new(polygon.exterior().clone(), vec![]);
    if result.is_valid && exterior_only.unsigned_area() == 0.0 {
        result.add_error("exterior".to_string(), "Polygon exterior has zero area".to_string());
    }

    result
}

fn validate_ring(ring: &LineString<f64>, location: &str, result: &mut ValidationResult) {
    // Closed rings need at least 4 coordinates (3 distinct + closing)
    if ring.0.len() < 4 {
        result.add_error(
            location.to_string(),
            format!("Ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let (Some(first), Some(last)) = (ring.0.first(), ring.0.last()) {
        if first != last {
            result.add_error(
                location.to_string(),
                "Ring must be closed (first point == last point)".to_string(),
            );
        }
    }

    for (i, coord) in ring.0.iter().enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
        }
    }
}

/// Reject a boundary that cannot be sampled
pub fn ensure_valid(boundary: &Boundary) -> Result<()> {
    let validation = validate_polygon(&boundary.polygon);
    if validation.is_valid {
        return Ok(());
    }

    Err(PanosweepError::InvalidGeometry {
        label: boundary.label.clone(),
        reason: validation
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .collect::<Vec<_>>()
            .join("; "),
    })
}
