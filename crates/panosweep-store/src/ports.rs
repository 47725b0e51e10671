use async_trait::async_trait;
use futures::stream::BoxStream;
use panosweep_core::error::Result;
use panosweep_core::models::{
    ClaimToken, LabelProgress, LatLon, PanoramaRecord, SampleId, SamplePoint,
};
use std::time::Duration;

/// Port for the persistent queue of candidate points
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Durably append points for one region; every point starts unsearched.
    /// Duplicate coordinates are stored as separate rows.
    async fn append_samples(&self, points: &[LatLon], label: &str) -> Result<u64>;

    /// Append one region's points from a stream of chunks as a single unit.
    ///
    /// Nothing is stored unless the stream ends cleanly; an `Err` item aborts
    /// the append and is returned.
    async fn append_stream(
        &self,
        label: &str,
        chunks: BoxStream<'_, Result<Vec<LatLon>>>,
    ) -> Result<u64>;

    /// Up to `limit` unsearched points in a stable order, regardless of claims
    async fn next_unsearched(&self, limit: usize) -> Result<Vec<SamplePoint>>;

    /// Atomically claim up to `limit` unsearched points that are unclaimed or
    /// whose claim is older than `lease`
    async fn claim_unsearched(
        &self,
        limit: usize,
        token: &ClaimToken,
        lease: Duration,
    ) -> Result<Vec<SamplePoint>>;

    /// Refresh the claim `token` holds on a point, restarting its lease.
    ///
    /// Returns `false` when the point is already searched or its claim has
    /// passed to another token, in which case the caller must not look it up.
    async fn renew_claim(&self, id: SampleId, token: &ClaimToken) -> Result<bool>;

    /// Give a claimed point back to the queue; a no-op if `token` no longer holds it
    async fn release_claim(&self, id: SampleId, token: &ClaimToken) -> Result<()>;

    /// Permanently flag a point as searched. Idempotent.
    async fn mark_searched(&self, id: SampleId) -> Result<()>;

    /// Number of points not yet searched
    async fn count_unsearched(&self) -> Result<u64>;

    /// Number of points stored
    async fn count_total(&self) -> Result<u64>;

    /// Searched/total counts grouped by label, ordered by label
    async fn label_progress(&self) -> Result<Vec<LabelProgress>>;
}

/// Port for the identifier-keyed panorama table
#[async_trait]
pub trait PanoramaStore: Send + Sync {
    /// Insert, or merge into the existing row without losing known metadata
    async fn upsert_panorama(&self, record: &PanoramaRecord) -> Result<()>;

    /// Get a panorama by identifier
    async fn get_panorama(&self, pano_id: &str) -> Result<Option<PanoramaRecord>>;

    /// All panoramas ordered by identifier
    async fn list_panoramas(&self) -> Result<Vec<PanoramaRecord>>;

    async fn count_panoramas(&self) -> Result<u64>;

    /// Panoramas with both a non-empty date and a non-empty copyright
    async fn count_complete_metadata(&self) -> Result<u64>;
}

/// Both stores behind one handle, with the discovery commit made atomic
#[async_trait]
pub trait DiscoveryStore: SampleStore + PanoramaStore {
    /// Upsert `record` and mark `id` searched as a single unit: either both
    /// happen or neither does
    async fn record_found(&self, id: SampleId, record: &PanoramaRecord) -> Result<()>;
}
