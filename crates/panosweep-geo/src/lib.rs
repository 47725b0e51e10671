//! Panosweep Geo - Lattice sampling over polygon boundaries
//!
//! A regular grid is laid over each boundary's bounding box and filtered
//! through a prepared polygon, lazily, so that boxes holding millions of
//! candidate points never have to be materialised.

pub mod containment;
pub mod grid;
pub mod sampling;
pub mod units;
pub mod validation;

pub use containment::PreparedPolygon;
pub use grid::{GridBounds, Lattice, LatticeIter};
pub use sampling::{BoundarySamples, Sampler};
pub use units::{meters_to_degrees, METERS_PER_DEGREE};
