//! Error types for lookups and crawl orchestration

use panosweep_core::error::PanosweepError;
use std::time::Duration;
use thiserror::Error;

/// A failed lookup. Every variant is transient: the point stays unsearched
/// and is retried later. "No panorama here" is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Lookup service error: {0}")]
    Service(String),

    #[error("Failed to decode lookup response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Store(#[from] PanosweepError),

    #[error("Lookup service unavailable after {consecutive_failures} consecutive failures")]
    ServiceUnavailable { consecutive_failures: u32 },

    #[error("Worker task failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
