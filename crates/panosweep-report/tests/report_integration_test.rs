use panosweep_core::models::{LatLon, PanoramaRecord, SampleId, Throughput};
use panosweep_core::config::{ConfigOverrides, LayeredConfig};
use panosweep_report::{export_configured, export_to_path, Metric, ProgressReporter};
use panosweep_store::{DiscoveryStore, MemoryStore, PanoramaStore, SampleStore, SqliteConfig, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

fn points(n: usize) -> Vec<LatLon> {
    (0..n).map(|i| LatLon::new(37.7 + i as f64 * 0.001, -122.4)).collect()
}

/// 100 points, 40 searched, 30 panoramas of which 12 have full metadata
async fn populate<S: DiscoveryStore>(store: &S) {
    store.append_samples(&points(100), "Mission").await.unwrap();
    for i in 1..=40 {
        store.mark_searched(SampleId(i)).await.unwrap();
    }
    for i in 0..30 {
        let mut record = PanoramaRecord::new(format!("pano-{:02}", i), 37.7, -122.4);
        if i < 12 {
            record = record.with_date(Some("2023-09")).with_copyright(Some("© Google"));
        }
        store.upsert_panorama(&record).await.unwrap();
    }
}

#[tokio::test]
async fn test_metrics_over_memory_store() {
    let store = Arc::new(MemoryStore::new());
    let reporter = ProgressReporter::new(store.clone());

    assert_eq!(reporter.point_progress().await.unwrap(), Metric::NoData);
    assert_eq!(reporter.metadata_completeness().await.unwrap(), Metric::NoData);

    populate(store.as_ref()).await;

    let snapshot = reporter.snapshot().await.unwrap();
    assert_eq!(snapshot.counts.searched_points(), 40);
    assert_eq!(snapshot.point_progress, Metric::Value(0.4));
    assert_eq!(snapshot.panorama_yield, Metric::Value(0.75));
    assert_eq!(snapshot.expected_final_panoramas, Metric::Value(75.0));
    assert_eq!(snapshot.metadata_completeness, Metric::Value(0.4));

    // Individually computed metrics agree with the snapshot
    assert_eq!(reporter.point_progress().await.unwrap(), snapshot.point_progress);
    assert_eq!(reporter.panorama_yield().await.unwrap(), snapshot.panorama_yield);
    assert_eq!(reporter.expected_final_panoramas().await.unwrap(), snapshot.expected_final_panoramas);
    assert_eq!(reporter.metadata_completeness().await.unwrap(), snapshot.metadata_completeness);

    // Reading never changes the stores
    assert_eq!(store.count_unsearched().await.unwrap(), 60);
    assert_eq!(store.count_panoramas().await.unwrap(), 30);

    let eta = reporter.eta(Throughput::new(40, Duration::from_secs(20))).await.unwrap();
    assert_eq!(eta, Some(Duration::from_secs(30)));

    let labels = reporter.label_progress().await.unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!((labels[0].total, labels[0].searched, labels[0].remaining()), (100, 40, 60));
}

#[tokio::test]
async fn test_metrics_and_export_over_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig::new(dir.path().join("gsv.db")).unwrap();
    let store = Arc::new(SqliteStore::new(config).await.unwrap());
    populate(store.as_ref()).await;

    let snapshot = ProgressReporter::new(store.clone()).snapshot().await.unwrap();
    assert_eq!(snapshot.counts.complete_metadata, 12);
    assert_eq!(snapshot.expected_final_panoramas, Metric::Value(75.0));

    let path = dir.path().join("panoramas.tsv");
    let written = export_to_path(store.as_ref(), &path).await.unwrap();
    assert_eq!(written, 30);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 31);
    assert_eq!(lines[0], "pano_id\tlat\tlon\tdate\tcopyright\theading\tpitch\troll");
    assert_eq!(lines[1], "pano-00\t37.7\t-122.4\t2023-09-01\t© Google\t0.0\t0.0\t0.0");
    assert_eq!(lines[30], "pano-29\t37.7\t-122.4\tNULL\tNULL\t0.0\t0.0\t0.0");
}

#[tokio::test]
async fn test_export_rows_are_sorted_by_identifier() {
    let store = MemoryStore::new();
    for id in ["zeta", "alpha", "mid"] {
        store.upsert_panorama(&PanoramaRecord::new(id, 0.0, 0.0)).await.unwrap();
    }

    let rows = panosweep_report::export_rows(&store).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.pano_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
}

#[tokio::test]
async fn test_export_goes_to_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store
        .upsert_panorama(&PanoramaRecord::new("abc", 37.7601, -122.4148).with_date(Some("2024-04")))
        .await
        .unwrap();

    let target = dir.path().join("coverage.tsv");
    let mut config = LayeredConfig::with_defaults();
    config.apply_overrides(ConfigOverrides { export_path: Some(target.clone()), ..Default::default() });

    assert_eq!(export_configured(&store, &config).await.unwrap(), 1);
    let text = std::fs::read_to_string(&target).unwrap();
    assert_eq!(text.lines().nth(1), Some("abc\t37.7601\t-122.4148\t2024-04-01\tNULL\t0.0\t0.0\t0.0"));
}
