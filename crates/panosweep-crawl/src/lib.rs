//! Panosweep Crawl - Seeding and draining the sample queue
//!
//! Boundaries are sampled into the store, then a pool of discovery workers
//! claims unsearched points, asks a [`PanoramaLookup`] about each one and
//! commits the outcome.

pub mod backoff;
pub mod error;
pub mod lookup;
pub mod metadata;
pub mod options;
pub mod pool;
pub mod seed;
pub mod worker;

pub use backoff::Backoff;
pub use error::{CrawlError, LookupError};
pub use lookup::PanoramaLookup;
pub use metadata::StreetViewMetadataClient;
pub use options::CrawlOptions;
pub use pool::{CrawlPool, CrawlSummary};
pub use seed::{seed_boundaries, BoundaryFailure, BoundarySeed, SeedOptions, SeedReport};
pub use worker::{DiscoveryWorker, PointOutcome, WorkerStats};
