//! A single discovery worker draining the shared sample queue.
//!
//! A point leaves the worker in exactly one of two states: searched, with
//! its panorama (if any) committed in the same transaction, or unsearched
//! with its claim released. Cancellation is only observed between points.
//!
//! The claim is renewed right before each lookup, so a lease only has to
//! cover one lookup rather than a whole batch. A point whose claim has
//! passed to another worker is skipped.

use panosweep_core::models::{ClaimToken, SamplePoint};
use panosweep_store::DiscoveryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{CrawlError, LookupError, Result};
use crate::lookup::PanoramaLookup;
use crate::options::CrawlOptions;

/// What happened to one point
#[derive(Debug)]
pub enum PointOutcome {
    /// A panorama was recorded and the point marked searched
    Found { pano_id: String },
    /// Nothing there; the point was marked searched
    NotFound,
    /// The lookup failed; the point was released for a later attempt
    Transient(LookupError),
}

/// Per-worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub searched: u64,
    pub found: u64,
    pub not_found: u64,
    pub transient_failures: u64,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.searched += other.searched;
        self.found += other.found;
        self.not_found += other.not_found;
        self.transient_failures += other.transient_failures;
    }

    fn record(&mut self, outcome: &PointOutcome) {
        match outcome {
            PointOutcome::Found { .. } => {
                self.searched += 1;
                self.found += 1;
            }
            PointOutcome::NotFound => {
                self.searched += 1;
                self.not_found += 1;
            }
            PointOutcome::Transient(_) => self.transient_failures += 1,
        }
    }
}

pub struct DiscoveryWorker<S: ?Sized, L: ?Sized> {
    store: Arc<S>,
    lookup: Arc<L>,
    token: ClaimToken,
    options: CrawlOptions,
    cancel: CancellationToken,
}

impl<S, L> DiscoveryWorker<S, L>
where
    S: DiscoveryStore + ?Sized,
    L: PanoramaLookup + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        lookup: Arc<L>,
        token: ClaimToken,
        options: CrawlOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self { store, lookup, token, options, cancel }
    }

    pub fn token(&self) -> &ClaimToken {
        &self.token
    }

    /// Claim and process batches until the queue has nothing left for this
    /// worker or the run is cancelled
    pub async fn run(&self) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();
        let mut backoff = Backoff::new(self.options.backoff_base, self.options.backoff_max);
        let mut consecutive_failures = 0u32;

        while !self.cancel.is_cancelled() {
            let batch = self
                .store
                .claim_unsearched(self.options.batch_size, &self.token, self.options.lease)
                .await?;
            if batch.is_empty() {
                break;
            }
            tracing::debug!(worker = %self.token, points = batch.len(), "Claimed batch");

            let mut pending = batch.into_iter();
            while let Some(point) = pending.next() {
                if self.cancel.is_cancelled() {
                    self.release_all(std::iter::once(point).chain(pending)).await?;
                    return Ok(stats);
                }

                // The batch may outlive its lease; confirm the point is still ours
                if !self.store.renew_claim(point.id, &self.token).await? {
                    tracing::debug!(worker = %self.token, sample = %point.id, "Claim lost, skipping");
                    continue;
                }

                let outcome = self.process_point(&point).await?;
                stats.record(&outcome);

                if let PointOutcome::Transient(err) = &outcome {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.options.max_consecutive_failures {
                        tracing::error!(
                            worker = %self.token,
                            consecutive_failures,
                            error = %err,
                            "Giving up on lookup service"
                        );
                        self.release_all(pending).await?;
                        return Err(CrawlError::ServiceUnavailable { consecutive_failures });
                    }

                    let delay = backoff.next_delay();
                    tracing::warn!(
                        worker = %self.token,
                        sample = %point.id,
                        error = %err,
                        retry_in = ?delay,
                        "Lookup failed, point left unsearched"
                    );
                    self.pause(delay).await;
                } else {
                    consecutive_failures = 0;
                    backoff.reset();
                    self.pause(self.options.request_interval).await;
                }
            }
        }

        Ok(stats)
    }

    /// Look one point up and commit the outcome.
    ///
    /// Store failures are returned as errors; lookup failures (timeouts
    /// included) become [`PointOutcome::Transient`].
    pub async fn process_point(&self, point: &SamplePoint) -> Result<PointOutcome> {
        let lookup = self.lookup.lookup(point.lat, point.lon);
        let result = match tokio::time::timeout(self.options.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.options.lookup_timeout)),
        };

        match result {
            Ok(Some(record)) => {
                self.store.record_found(point.id, &record).await?;
                tracing::debug!(sample = %point.id, pano_id = %record.pano_id, "Panorama found");
                Ok(PointOutcome::Found { pano_id: record.pano_id })
            }
            Ok(None) => {
                self.store.mark_searched(point.id).await?;
                tracing::debug!(sample = %point.id, "No panorama");
                Ok(PointOutcome::NotFound)
            }
            Err(err) => {
                self.store.release_claim(point.id, &self.token).await?;
                Ok(PointOutcome::Transient(err))
            }
        }
    }

    async fn release_all(&self, points: impl Iterator<Item = SamplePoint>) -> Result<()> {
        for point in points {
            self.store.release_claim(point.id, &self.token).await?;
        }
        Ok(())
    }

    /// Sleep, waking early on cancellation
    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
