//! Regular lattice over an axis-aligned bounding box.
//!
//! Points are `(min_x + i·s, min_y + j·s)` for `i, j ≥ 0` while the coordinate
//! stays strictly below the box maximum. Iteration is row-major (y outer, x
//! inner) and computes each coordinate from its indices, so no error
//! accumulates along a row and the iterator can be restarted at any time.

use geo::{Coord, Rect};
use panosweep_core::error::{PanosweepError, Result};

/// Upper bound on lattice steps per axis
const MAX_AXIS_STEPS: f64 = 1e9;

/// Axis-aligned bounding box with `min < max` on both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GridBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(PanosweepError::DegenerateBounds {
                reason: format!(
                    "non-finite coordinate in ({}, {}, {}, {})",
                    min_x, min_y, max_x, max_y
                ),
            });
        }
        if min_x >= max_x {
            return Err(PanosweepError::DegenerateBounds {
                reason: format!("min_x ({}) must be less than max_x ({})", min_x, max_x),
            });
        }
        if min_y >= max_y {
            return Err(PanosweepError::DegenerateBounds {
                reason: format!("min_y ({}) must be less than max_y ({})", min_y, max_y),
            });
        }
        Ok(Self { min_x, min_y, max_x, max_y })
    }

    pub fn from_rect(rect: Rect<f64>) -> Result<Self> {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A lattice of candidate points at a fixed spacing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    bounds: GridBounds,
    spacing: f64,
    cols: u64,
    rows: u64,
}

impl Lattice {
    pub fn new(bounds: GridBounds, spacing: f64) -> Result<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(PanosweepError::InvalidSpacing { spacing });
        }
        if bounds.width() / spacing > MAX_AXIS_STEPS || bounds.height() / spacing > MAX_AXIS_STEPS
        {
            return Err(PanosweepError::InvalidSpacing { spacing });
        }

        let cols = axis_steps(bounds.min_x, bounds.max_x, spacing);
        let rows = axis_steps(bounds.min_y, bounds.max_y, spacing);

        Ok(Self { bounds, spacing, cols, rows })
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Number of distinct x positions
    pub fn cols(&self) -> u64 {
        self.cols
    }

    /// Number of distinct y positions
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Total number of lattice points
    pub fn len(&self) -> u64 {
        self.cols.saturating_mul(self.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate at column `col`, row `row`
    pub fn point(&self, col: u64, row: u64) -> Coord<f64> {
        Coord {
            x: self.bounds.min_x + col as f64 * self.spacing,
            y: self.bounds.min_y + row as f64 * self.spacing,
        }
    }

    pub fn iter(&self) -> LatticeIter {
        LatticeIter { lattice: *self, next: 0, end: self.len() }
    }
}

impl IntoIterator for Lattice {
    type Item = Coord<f64>;
    type IntoIter = LatticeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy row-major walk over a [`Lattice`]
#[derive(Debug, Clone)]
pub struct LatticeIter {
    lattice: Lattice,
    next: u64,
    end: u64,
}

impl Iterator for LatticeIter {
    type Item = Coord<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let cols = self.lattice.cols;
        Some(self.lattice.point(index % cols, index / cols))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n as u64).min(self.end);
        self.next()
    }
}

/// Count of `i ≥ 0` with `min + i·step < max`
fn axis_steps(min: f64, max: f64, step: f64) -> u64 {
    let mut n = ((max - min) / step).ceil() as u64;
    while n > 0 && min + (n - 1) as f64 * step >= max {
        n -= 1;
    }
    while min + n as f64 * step < max {
        n += 1;
    }
    n
}
