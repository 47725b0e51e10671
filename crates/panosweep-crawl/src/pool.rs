//! Fan-out of discovery workers over one store.

use panosweep_core::models::{ClaimToken, Throughput};
use panosweep_store::DiscoveryStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CrawlError, Result};
use crate::lookup::PanoramaLookup;
use crate::options::CrawlOptions;
use crate::worker::{DiscoveryWorker, WorkerStats};

/// Totals for one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub searched: u64,
    pub found: u64,
    pub not_found: u64,
    pub transient_failures: u64,
    pub elapsed: Duration,
}

impl CrawlSummary {
    fn from_stats(stats: WorkerStats, elapsed: Duration) -> Self {
        Self {
            searched: stats.searched,
            found: stats.found,
            not_found: stats.not_found,
            transient_failures: stats.transient_failures,
            elapsed,
        }
    }

    /// Searched points per unit of wall-clock time for this run
    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.searched, self.elapsed)
    }
}

/// Runs `options.workers` discovery workers until the queue drains
pub struct CrawlPool<S: ?Sized, L: ?Sized> {
    store: Arc<S>,
    lookup: Arc<L>,
    options: CrawlOptions,
    cancel: CancellationToken,
}

impl<S, L> CrawlPool<S, L>
where
    S: DiscoveryStore + ?Sized + 'static,
    L: PanoramaLookup + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, lookup: Arc<L>, options: CrawlOptions) -> Self {
        Self { store, lookup, options, cancel: CancellationToken::new() }
    }

    /// Stop on an externally owned token, such as one tied to a shutdown signal
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops every worker after its current point
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Drain the queue.
    ///
    /// When one worker fails the others are stopped after their current
    /// point, and the first failure is returned once all have exited.
    pub async fn run(&self) -> Result<CrawlSummary> {
        self.options.validate()?;

        let started = Instant::now();
        let run_cancel = self.cancel.child_token();
        let workers = self.options.workers;

        tracing::info!(workers, batch_size = self.options.batch_size, "Starting crawl");

        let mut tasks = JoinSet::new();
        for _ in 0..workers {
            let worker = DiscoveryWorker::new(
                self.store.clone(),
                self.lookup.clone(),
                ClaimToken::new(Uuid::new_v4().to_string()),
                self.options.clone(),
                run_cancel.clone(),
            );
            tasks.spawn(async move { worker.run().await });
        }

        let mut totals = WorkerStats::default();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| CrawlError::Worker(e.to_string())).and_then(|r| r);
            match result {
                Ok(stats) => totals.merge(&stats),
                Err(err) => {
                    tracing::error!(error = %err, "Worker stopped");
                    run_cancel.cancel();
                    first_error.get_or_insert(err);
                }
            }
        }

        let summary = CrawlSummary::from_stats(totals, started.elapsed());
        tracing::info!(
            searched = summary.searched,
            found = summary.found,
            not_found = summary.not_found,
            transient_failures = summary.transient_failures,
            elapsed = ?summary.elapsed,
            cancelled = self.cancel.is_cancelled(),
            "Crawl finished"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}
