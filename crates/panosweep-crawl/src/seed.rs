//! Sampling boundaries into the store.
//!
//! Each boundary is sampled on a blocking thread and streamed to the store in
//! chunks through a bounded channel, so memory stays flat however many
//! lattice points a bounding box holds. A boundary is appended as one unit:
//! if its sampling or storage fails partway, none of its points are kept.

use futures::stream::{self, FuturesUnordered, StreamExt};
use panosweep_core::error::PanosweepError;
use panosweep_core::models::{Boundary, LatLon};
use panosweep_geo::Sampler;
use panosweep_store::SampleStore;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{CrawlError, Result};

/// Chunks buffered between the sampler thread and the store writer
const CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Points per `append_samples` call
    pub chunk_size: usize,
    /// Boundaries sampled at the same time
    pub parallelism: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
        }
    }
}

/// Points stored for one boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundarySeed {
    pub label: String,
    /// Lattice points in the bounding box
    pub candidates: u64,
    /// Points inside the polygon, now in the store
    pub inserted: u64,
}

/// A boundary skipped because its geometry could not be sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFailure {
    pub label: String,
    pub reason: String,
}

/// Outcome of seeding, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded: Vec<BoundarySeed>,
    pub failures: Vec<BoundaryFailure>,
}

impl SeedReport {
    pub fn total_inserted(&self) -> u64 {
        self.seeded.iter().map(|s| s.inserted).sum()
    }
}

enum BoundaryResult {
    Seeded(BoundarySeed),
    Failed(BoundaryFailure),
}

/// Sample every boundary and append its points under the boundary's label.
///
/// A geometry error skips that boundary and is listed in the report. A store
/// error aborts the run; boundaries already appended stay, the failing one
/// leaves nothing behind.
pub async fn seed_boundaries<S>(
    store: Arc<S>,
    boundaries: Vec<Boundary>,
    sampler: Sampler,
    options: SeedOptions,
) -> Result<SeedReport>
where
    S: SampleStore + ?Sized + 'static,
{
    let chunk_size = options.chunk_size.max(1);
    let parallelism = options.parallelism.max(1);
    let total = boundaries.len();

    tracing::info!(
        boundaries = total,
        spacing_degrees = sampler.spacing_degrees(),
        "Seeding sample points"
    );

    let mut running = FuturesUnordered::new();
    let mut results: Vec<Option<BoundaryResult>> = Vec::with_capacity(total);
    results.resize_with(total, || None);

    for (index, boundary) in boundaries.into_iter().enumerate() {
        let store = store.clone();
        running.push(async move { (index, seed_one(store, boundary, sampler, chunk_size).await) });

        while running.len() >= parallelism {
            if let Some((index, result)) = running.next().await {
                results[index] = Some(result?);
            }
        }
    }

    while let Some((index, result)) = running.next().await {
        results[index] = Some(result?);
    }

    let mut report = SeedReport::default();
    for result in results.into_iter().flatten() {
        match result {
            BoundaryResult::Seeded(seed) => report.seeded.push(seed),
            BoundaryResult::Failed(failure) => report.failures.push(failure),
        }
    }

    tracing::info!(
        inserted = report.total_inserted(),
        seeded = report.seeded.len(),
        skipped = report.failures.len(),
        "Seeding finished"
    );
    Ok(report)
}

/// Sampler-to-writer message; `End` marks a boundary sampled to completion
enum SampleMessage {
    Chunk(Vec<LatLon>),
    End,
}

async fn seed_one<S>(
    store: Arc<S>,
    boundary: Boundary,
    sampler: Sampler,
    chunk_size: usize,
) -> Result<BoundaryResult>
where
    S: SampleStore + ?Sized + 'static,
{
    let label = boundary.label.clone();
    let (tx, rx) = mpsc::channel::<SampleMessage>(CHANNEL_DEPTH);

    let producer = tokio::task::spawn_blocking(move || -> panosweep_core::Result<u64> {
        let samples = sampler.sample(&boundary)?;
        let candidates = samples.candidates();

        let mut chunk = Vec::with_capacity(chunk_size);
        for point in samples {
            chunk.push(point);
            if chunk.len() == chunk_size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                // The writer only hangs up after a store error
                if tx.blocking_send(SampleMessage::Chunk(full)).is_err() {
                    return Ok(candidates);
                }
            }
        }
        if !chunk.is_empty() && tx.blocking_send(SampleMessage::Chunk(chunk)).is_err() {
            return Ok(candidates);
        }
        let _ = tx.blocking_send(SampleMessage::End);
        Ok(candidates)
    });

    // A channel closed before `End` means the sampler failed; the error item
    // rolls the append back and the sampler's own error is reported below
    let chunks = stream::unfold(Some(rx), |rx| async move {
        let mut rx = match rx {
            Some(rx) => rx,
            None => return None,
        };
        match rx.recv().await {
            Some(SampleMessage::Chunk(points)) => Some((Ok(points), Some(rx))),
            Some(SampleMessage::End) => None,
            None => {
                let stopped = PanosweepError::Storage(
                    "sampling stopped before the boundary was complete".to_string(),
                );
                Some((Err(stopped), None))
            }
        }
    });
    let appended = store.append_stream(&label, chunks.boxed()).await;

    let sampled = producer.await.map_err(|e| CrawlError::Worker(e.to_string()))?;
    match sampled {
        Ok(candidates) => {
            let inserted = appended.map_err(|e| {
                tracing::error!(label = %label, error = %e, "Failed to store sample points");
                e
            })?;
            tracing::debug!(label = %label, candidates, inserted, "Boundary seeded");
            Ok(BoundaryResult::Seeded(BoundarySeed { label, candidates, inserted }))
        }
        Err(err) if err.is_geometry_error() => {
            tracing::warn!(label = %label, error = %err, "Skipping boundary");
            Ok(BoundaryResult::Failed(BoundaryFailure { label, reason: err.to_string() }))
        }
        Err(err) => Err(CrawlError::Store(err)),
    }
}
