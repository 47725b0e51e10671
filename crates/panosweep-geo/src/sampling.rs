//! Boundary sampling: lattice over the bounding box, filtered by containment.

use crate::containment::PreparedPolygon;
use crate::grid::{GridBounds, Lattice, LatticeIter};
use crate::units::{meters_to_degrees, DEFAULT_SAMPLE_INTERVAL_METERS};
use crate::validation::ensure_valid;
use panosweep_core::config::LayeredConfig;
use panosweep_core::error::{PanosweepError, Result};
use panosweep_core::models::{Boundary, LatLon};

/// Produces candidate points for boundaries at a fixed spacing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    spacing_degrees: f64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self { spacing_degrees: meters_to_degrees(DEFAULT_SAMPLE_INTERVAL_METERS) }
    }
}

impl Sampler {
    /// Spacing given directly in coordinate units
    pub fn new(spacing_degrees: f64) -> Result<Self> {
        if !spacing_degrees.is_finite() || spacing_degrees <= 0.0 {
            return Err(PanosweepError::InvalidSpacing { spacing: spacing_degrees });
        }
        Ok(Self { spacing_degrees })
    }

    /// Spacing given as a ground distance, converted with the fixed
    /// meters-per-degree approximation
    pub fn from_meters(meters: f64) -> Result<Self> {
        if !meters.is_finite() || meters <= 0.0 {
            return Err(PanosweepError::InvalidSpacing { spacing: meters });
        }
        Self::new(meters_to_degrees(meters))
    }

    /// Spacing from `sample_interval_meters`
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Self::from_meters(config.sample_interval_meters.value)
    }

    pub fn spacing_degrees(&self) -> f64 {
        self.spacing_degrees
    }

    /// Lazily sample one boundary.
    ///
    /// Geometry problems are returned for this boundary only.
    pub fn sample(&self, boundary: &Boundary) -> Result<BoundarySamples> {
        ensure_valid(boundary)?;

        let prepared = PreparedPolygon::new(&boundary.polygon).map_err(|e| relabel(e, boundary))?;
        let bounds =
            GridBounds::from_rect(prepared.bounding_rect()).map_err(|e| relabel(e, boundary))?;
        let lattice = Lattice::new(bounds, self.spacing_degrees)?;

        tracing::debug!(
            label = %boundary.label,
            candidates = lattice.len(),
            edges = prepared.edge_count(),
            "Prepared boundary for sampling"
        );

        Ok(BoundarySamples { lattice: lattice.iter(), prepared, candidates: lattice.len() })
    }
}

fn relabel(err: PanosweepError, boundary: &Boundary) -> PanosweepError {
    match err {
        PanosweepError::InvalidGeometry { reason, .. } => {
            PanosweepError::InvalidGeometry { label: boundary.label.clone(), reason }
        }
        PanosweepError::DegenerateBounds { reason } => PanosweepError::InvalidGeometry {
            label: boundary.label.clone(),
            reason: format!("degenerate bounding box: {}", reason),
        },
        other => other,
    }
}

/// Lazy stream of the lattice points inside one boundary
#[derive(Debug)]
pub struct BoundarySamples {
    lattice: LatticeIter,
    prepared: PreparedPolygon,
    candidates: u64,
}

impl BoundarySamples {
    /// Number of lattice points in the bounding box, before filtering
    pub fn candidates(&self) -> u64 {
        self.candidates
    }
}

impl Iterator for BoundarySamples {
    type Item = LatLon;

    fn next(&mut self) -> Option<Self::Item> {
        let prepared = &self.prepared;
        self.lattice.find(|c| prepared.contains(*c)).map(LatLon::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.lattice.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString, Polygon};

    fn unit_square() -> Boundary {
        Boundary::new(
            "unit",
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)],
        )
    }

    #[test]
    fn test_unit_square_at_half_spacing() {
        let sampler = Sampler::new(0.5).unwrap();
        let samples = sampler.sample(&unit_square()).unwrap();
        assert_eq!(samples.candidates(), 4);

        let points: Vec<(f64, f64)> = samples.map(|p| (p.lon, p.lat)).collect();
        assert_eq!(points, vec![(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)]);
    }

    #[test]
    fn test_square_minus_concentric_hole() {
        let boundary = Boundary::new(
            "ring",
            polygon!(
                exterior: [(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)],
                interiors: [[(x: 0.25, y: 0.25), (x: 0.75, y: 0.25), (x: 0.75, y: 0.75), (x: 0.25, y: 0.75)]],
            ),
        );
        let sampler = Sampler::new(0.125).unwrap();

        let points: Vec<LatLon> = sampler.sample(&boundary).unwrap().collect();

        // 8x8 lattice minus the 3x3 block strictly inside the hole
        assert_eq!(points.len(), 64 - 9);
        assert!(points.iter().all(|p| {
            !(p.lon > 0.25 && p.lon < 0.75 && p.lat > 0.25 && p.lat < 0.75)
        }));
    }

    #[test]
    fn test_default_spacing_is_five_meters() {
        let sampler = Sampler::default();
        assert!((sampler.spacing_degrees() - 5.0 / 111_000.0).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_polygon_is_labelled() {
        let boundary =
            Boundary::new("Broken", Polygon::new(LineString::from(vec![(0.0, 0.0)]), vec![]));
        let err = Sampler::default().sample(&boundary).unwrap_err();
        assert!(err.is_geometry_error());
        assert!(matches!(err, PanosweepError::InvalidGeometry { ref label, .. } if label == "Broken"));
    }

    #[test]
    fn test_invalid_spacing() {
        assert!(Sampler::new(0.0).is_err());
        assert!(Sampler::new(f64::NAN).is_err());
        assert!(matches!(
            Sampler::from_meters(0.0),
            Err(PanosweepError::InvalidSpacing { .. })
        ));
        assert!(Sampler::from_meters(-5.0).is_err());
        assert!(Sampler::from_meters(f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_config_uses_sample_interval() {
        let mut config = LayeredConfig::with_defaults();
        assert_eq!(Sampler::from_config(&config).unwrap(), Sampler::default());

        config.sample_interval_meters.value = 111.0;
        let sampler = Sampler::from_config(&config).unwrap();
        assert!((sampler.spacing_degrees() - 0.001).abs() < 1e-15);

        config.sample_interval_meters.value = -1.0;
        assert!(Sampler::from_config(&config).is_err());
    }
}
