use geo::Polygon;

/// A simple polygon (outer ring plus optional holes) tagged with the
/// region it belongs to.
///
/// Multi-part regions arrive as several boundaries sharing one label.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub label: String,
    pub polygon: Polygon<f64>,
}

impl Boundary {
    pub fn new(label: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self { label: label.into(), polygon }
    }
}
