mod common;

use async_trait::async_trait;
use common::{init_tracing, Reply, ScriptedLookup};
use futures::stream::{self, BoxStream, StreamExt};
use geo::{polygon, LineString, Polygon};
use panosweep_core::error::{PanosweepError, Result as CoreResult};
use panosweep_core::models::{Boundary, ClaimToken, LabelProgress, LatLon, SampleId, SamplePoint};
use panosweep_crawl::{seed_boundaries, CrawlError, CrawlOptions, CrawlPool, SeedOptions};
use panosweep_geo::Sampler;
use panosweep_store::{MemoryStore, SampleStore, SqliteConfig, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

/// Memory store whose append for one label fails after the first chunk
struct FailingAppendStore {
    inner: MemoryStore,
    failing_label: String,
}

#[async_trait]
impl SampleStore for FailingAppendStore {
    async fn append_samples(&self, points: &[LatLon], label: &str) -> CoreResult<u64> {
        self.inner.append_samples(points, label).await
    }

    async fn append_stream(
        &self,
        label: &str,
        chunks: BoxStream<'_, CoreResult<Vec<LatLon>>>,
    ) -> CoreResult<u64> {
        if label != self.failing_label {
            return self.inner.append_stream(label, chunks).await;
        }
        let disk_full = stream::once(async { Err(PanosweepError::Storage("disk full".to_string())) });
        self.inner.append_stream(label, chunks.take(1).chain(disk_full).boxed()).await
    }

    async fn next_unsearched(&self, limit: usize) -> CoreResult<Vec<SamplePoint>> {
        self.inner.next_unsearched(limit).await
    }

    async fn claim_unsearched(
        &self,
        limit: usize,
        token: &ClaimToken,
        lease: Duration,
    ) -> CoreResult<Vec<SamplePoint>> {
        self.inner.claim_unsearched(limit, token, lease).await
    }

    async fn renew_claim(&self, id: SampleId, token: &ClaimToken) -> CoreResult<bool> {
        self.inner.renew_claim(id, token).await
    }

    async fn release_claim(&self, id: SampleId, token: &ClaimToken) -> CoreResult<()> {
        self.inner.release_claim(id, token).await
    }

    async fn mark_searched(&self, id: SampleId) -> CoreResult<()> {
        self.inner.mark_searched(id).await
    }

    async fn count_unsearched(&self) -> CoreResult<u64> {
        self.inner.count_unsearched().await
    }

    async fn count_total(&self) -> CoreResult<u64> {
        self.inner.count_total().await
    }

    async fn label_progress(&self) -> CoreResult<Vec<LabelProgress>> {
        self.inner.label_progress().await
    }
}

fn unit_square(label: &str) -> Boundary {
    Boundary::new(
        label,
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)],
    )
}

fn options(chunk_size: usize, parallelism: usize) -> SeedOptions {
    SeedOptions { chunk_size, parallelism }
}

#[tokio::test]
async fn test_unit_square_seeds_four_unsearched_points() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());

    let report = seed_boundaries(
        store.clone(),
        vec![unit_square("unit")],
        Sampler::new(0.5).unwrap(),
        SeedOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.seeded.len(), 1);
    assert_eq!(report.seeded[0].candidates, 4);
    assert_eq!(report.seeded[0].inserted, 4);
    assert!(report.failures.is_empty());

    let stored = store.next_unsearched(10).await.unwrap();
    let coords: Vec<LatLon> = stored.iter().map(|p| p.coordinate()).collect();
    assert_eq!(
        coords,
        vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 0.5),
            LatLon::new(0.5, 0.0),
            LatLon::new(0.5, 0.5),
        ]
    );
    assert!(stored.iter().all(|p| !p.searched && p.label == "unit"));
    assert_eq!(store.count_unsearched().await.unwrap(), 4);
}

#[tokio::test]
async fn test_invalid_boundary_is_skipped_and_others_continue() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let broken = Boundary::new(
        "Broken",
        Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]), vec![]),
    );

    let report = seed_boundaries(
        store.clone(),
        vec![unit_square("First"), broken, unit_square("Last")],
        Sampler::new(0.25).unwrap(),
        options(5, 2),
    )
    .await
    .unwrap();

    let labels: Vec<&str> = report.seeded.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["First", "Last"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].label, "Broken");
    assert_eq!(report.total_inserted(), 32);
    assert_eq!(store.count_total().await.unwrap(), 32);
}

#[tokio::test]
async fn test_chunked_seeding_matches_sampler_output() {
    let store = Arc::new(MemoryStore::new());
    let boundary = Boundary::new(
        "Triangle",
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)],
    );
    let sampler = Sampler::new(0.01).unwrap();
    let expected: Vec<LatLon> = sampler.sample(&boundary).unwrap().collect();

    let report = seed_boundaries(store.clone(), vec![boundary], sampler, options(7, 1))
        .await
        .unwrap();

    assert_eq!(report.total_inserted(), expected.len() as u64);
    let stored: Vec<LatLon> = store
        .next_unsearched(expected.len() + 1)
        .await
        .unwrap()
        .iter()
        .map(|p| p.coordinate())
        .collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_parts_sharing_a_label_aggregate() {
    let store = Arc::new(MemoryStore::new());
    let east = Boundary::new(
        "Islands",
        polygon![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 2.0, y: 1.0)],
    );

    seed_boundaries(
        store.clone(),
        vec![unit_square("Islands"), east, unit_square("Mainland")],
        Sampler::new(0.5).unwrap(),
        options(2, 3),
    )
    .await
    .unwrap();

    assert_eq!(
        store.label_progress().await.unwrap(),
        vec![
            LabelProgress { label: "Islands".to_string(), total: 8, searched: 0 },
            LabelProgress { label: "Mainland".to_string(), total: 4, searched: 0 },
        ]
    );
}

#[tokio::test]
async fn test_seed_then_crawl_on_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store =
        Arc::new(SqliteStore::new(SqliteConfig::new(dir.path().join("gsv.db")).unwrap()).await.unwrap());

    let report = seed_boundaries(
        store.clone(),
        vec![unit_square("unit")],
        Sampler::new(0.5).unwrap(),
        options(3, 1),
    )
    .await
    .unwrap();
    assert_eq!(report.total_inserted(), 4);

    let lookup = Arc::new(ScriptedLookup::new(Reply::NotFound));
    let summary =
        CrawlPool::new(store.clone(), lookup.clone(), CrawlOptions::default()).run().await.unwrap();

    assert_eq!(summary.searched, 4);
    assert_eq!(summary.not_found, 4);
    assert_eq!(store.count_unsearched().await.unwrap(), 0);
    assert_eq!(lookup.max_calls_per_point(), 1);
}

#[tokio::test]
async fn test_store_failure_leaves_no_partial_boundary() {
    init_tracing();
    let store = Arc::new(FailingAppendStore {
        inner: MemoryStore::new(),
        failing_label: "Second".to_string(),
    });

    let err = seed_boundaries(
        store.clone(),
        vec![unit_square("First"), unit_square("Second")],
        Sampler::new(0.25).unwrap(),
        options(5, 1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CrawlError::Store(PanosweepError::Storage(_))));
    // The first boundary is intact; none of the second's 16 points remain
    assert_eq!(store.count_total().await.unwrap(), 16);
    let progress = store.label_progress().await.unwrap();
    assert_eq!(progress, vec![LabelProgress { label: "First".to_string(), total: 16, searched: 0 }]);
}

#[tokio::test]
async fn test_sqlite_seeding_appends_each_boundary_whole() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig::new(dir.path().join("gsv.db")).unwrap();
    let store = Arc::new(SqliteStore::new(config).await.unwrap());
    let boundaries: Vec<Boundary> =
        (0..6).map(|i| unit_square(&format!("Region {}", i))).collect();

    // Small chunks and full parallelism: appends queue on the store
    let report =
        seed_boundaries(store.clone(), boundaries, Sampler::new(0.125).unwrap(), options(7, 6))
            .await
            .unwrap();

    assert_eq!(report.seeded.len(), 6);
    assert_eq!(report.total_inserted(), 6 * 64);

    // Each label occupies one contiguous id range
    let stored = store.next_unsearched(1000).await.unwrap();
    let mut runs: Vec<&str> = Vec::new();
    for point in &stored {
        if runs.last() != Some(&point.label.as_str()) {
            runs.push(point.label.as_str());
        }
    }
    assert_eq!(runs.len(), 6);
}
