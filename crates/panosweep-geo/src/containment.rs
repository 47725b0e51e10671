//! Prepared point-in-polygon test.
//!
//! Every ring edge (exterior and holes) goes into an R-tree once. A query
//! then only touches the edges near the point and those crossing the
//! horizontal ray to its right, instead of walking every vertex per call.
//!
//! Boundary policy: a point lying exactly on any edge, hole edges included,
//! counts as inside.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Coord, LineString, Polygon, Rect};
use panosweep_core::error::{PanosweepError, Result};
use rstar::{RTree, RTreeObject, AABB};

/// A single ring segment
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    a: Coord<f64>,
    b: Coord<f64>,
}

impl Edge {
    /// Cross product of (b - a) and (p - a); zero when p is collinear
    fn cross(&self, p: Coord<f64>) -> f64 {
        (self.b.x - self.a.x) * (p.y - self.a.y) - (p.x - self.a.x) * (self.b.y - self.a.y)
    }

    fn touches(&self, p: Coord<f64>) -> bool {
        self.cross(p) == 0.0
            && p.x >= self.a.x.min(self.b.x)
            && p.x <= self.a.x.max(self.b.x)
            && p.y >= self.a.y.min(self.b.y)
            && p.y <= self.a.y.max(self.b.y)
    }

    /// Whether the ray from `p` towards +x crosses this edge.
    ///
    /// Half-open in y so a ray through a shared vertex is counted once.
    fn crosses_ray(&self, p: Coord<f64>) -> bool {
        if (self.a.y > p.y) == (self.b.y > p.y) {
            return false;
        }
        let upward = self.b.y > self.a.y;
        let cross = self.cross(p);
        if upward {
            cross > 0.0
        } else {
            cross < 0.0
        }
    }
}

impl RTreeObject for Edge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.a.x, self.a.y], [self.b.x, self.b.y])
    }
}

/// A polygon pre-processed for repeated containment queries
#[derive(Debug)]
pub struct PreparedPolygon {
    bbox: Rect<f64>,
    edges: RTree<Edge>,
}

impl PreparedPolygon {
    pub fn new(polygon: &Polygon<f64>) -> Result<Self> {
        let bbox = polygon.bounding_rect().ok_or_else(|| PanosweepError::InvalidGeometry {
            label: String::new(),
            reason: "polygon has no coordinates".to_string(),
        })?;

        let mut edges = Vec::new();
        collect_edges(polygon.exterior(), &mut edges);
        for interior in polygon.interiors() {
            collect_edges(interior, &mut edges);
        }

        Ok(Self { bbox, edges: RTree::bulk_load(edges) })
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        self.bbox
    }

    pub fn edge_count(&self) -> usize {
        self.edges.size()
    }

    /// Point-in-polygon by ray crossing parity; edge points are inside
    pub fn contains(&self, p: Coord<f64>) -> bool {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        if p.x < min.x || p.x > max.x || p.y < min.y || p.y > max.y {
            return false;
        }

        let here = AABB::from_point([p.x, p.y]);
        if self.edges.locate_in_envelope_intersecting(&here).any(|edge| edge.touches(p)) {
            return true;
        }

        let ray = AABB::from_corners([p.x, p.y], [max.x, p.y]);
        let crossings = self
            .edges
            .locate_in_envelope_intersecting(&ray)
            .filter(|edge| edge.crosses_ray(p))
            .count();

        crossings % 2 == 1
    }

    /// Lazily keep only the coordinates inside the polygon
    pub fn filter<'a, I>(&'a self, coords: I) -> impl Iterator<Item = Coord<f64>> + 'a
    where
        I: IntoIterator<Item = Coord<f64>>,
        I::IntoIter: 'a,
    {
        coords.into_iter().filter(move |c| self.contains(*c))
    }
}

fn collect_edges(ring: &LineString<f64>, edges: &mut Vec<Edge>) {
    for line in ring.lines() {
        // Repeated vertices produce zero-length segments that never cross
        if line.start != line.end {
            edges.push(Edge { a: line.start, b: line.end });
        }
    }
}
