//! In-memory storage implementation for development and testing.
//!
//! This implementation uses `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For durable workloads, use the SQLite backend.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use panosweep_core::error::{PanosweepError, Result};
use panosweep_core::models::{
    ClaimToken, LabelProgress, LatLon, PanoramaRecord, SampleId, SamplePoint,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::ports::{DiscoveryStore, PanoramaStore, SampleStore};

#[derive(Debug, Clone)]
struct SampleRow {
    point: SamplePoint,
    claim: Option<(ClaimToken, Instant)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Row `i` holds sample id `i + 1`
    samples: Vec<SampleRow>,
    panoramas: BTreeMap<String, PanoramaRecord>,
}

impl MemoryState {
    fn row_mut(&mut self, id: SampleId) -> Result<&mut SampleRow> {
        usize::try_from(id.0 - 1)
            .ok()
            .and_then(|index| self.samples.get_mut(index))
            .ok_or(PanosweepError::SampleNotFound { id: id.0 })
    }

    fn push_points(&mut self, points: &[LatLon], label: &str) {
        for point in points {
            let id = SampleId(self.samples.len() as i64 + 1);
            self.samples.push(SampleRow {
                point: SamplePoint {
                    id,
                    lat: point.lat,
                    lon: point.lon,
                    label: label.to_string(),
                    searched: false,
                },
                claim: None,
            });
        }
    }

    fn upsert(&mut self, record: &PanoramaRecord) {
        let record = record.clone().normalized();
        match self.panoramas.get_mut(&record.pano_id) {
            Some(existing) => existing.merge_from(&record),
            None => {
                self.panoramas.insert(record.pano_id.clone(), record);
            }
        }
    }
}

/// In-memory implementation of both stores behind a single lock, so every
/// operation is atomic with respect to the others
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn append_samples(&self, points: &[LatLon], label: &str) -> Result<u64> {
        let mut state = self.state.write().unwrap();
        state.push_points(points, label);
        Ok(points.len() as u64)
    }

    async fn append_stream(
        &self,
        label: &str,
        mut chunks: BoxStream<'_, Result<Vec<LatLon>>>,
    ) -> Result<u64> {
        // Staged outside the lock, then published in one step
        let mut staged = Vec::new();
        while let Some(chunk) = chunks.next().await {
            staged.extend(chunk?);
        }

        let mut state = self.state.write().unwrap();
        state.push_points(&staged, label);
        Ok(staged.len() as u64)
    }

    async fn next_unsearched(&self, limit: usize) -> Result<Vec<SamplePoint>> {
        let state = self.state.read().unwrap();
        Ok(state
            .samples
            .iter()
            .filter(|row| !row.point.searched)
            .take(limit)
            .map(|row| row.point.clone())
            .collect())
    }

    async fn claim_unsearched(
        &self,
        limit: usize,
        token: &ClaimToken,
        lease: Duration,
    ) -> Result<Vec<SamplePoint>> {
        let mut state = self.state.write().unwrap();
        let now = Instant::now();

        let mut claimed = Vec::new();
        for row in state.samples.iter_mut() {
            if claimed.len() >= limit {
                break;
            }
            if row.point.searched {
                continue;
            }
            let available = match &row.claim {
                None => true,
                Some((_, at)) => now.duration_since(*at) >= lease,
            };
            if available {
                row.claim = Some((token.clone(), now));
                claimed.push(row.point.clone());
            }
        }
        Ok(claimed)
    }

    async fn renew_claim(&self, id: SampleId, token: &ClaimToken) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        let row = state.row_mut(id)?;
        if row.point.searched {
            return Ok(false);
        }
        match &mut row.claim {
            Some((holder, at)) if *holder == *token => {
                *at = Instant::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(&self, id: SampleId, token: &ClaimToken) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let row = state.row_mut(id)?;
        if matches!(&row.claim, Some((holder, _)) if holder == token) {
            row.claim = None;
        }
        Ok(())
    }

    async fn mark_searched(&self, id: SampleId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let row = state.row_mut(id)?;
        row.point.searched = true;
        row.claim = None;
        Ok(())
    }

    async fn count_unsearched(&self) -> Result<u64> {
        let state = self.state.read().unwrap();
        Ok(state.samples.iter().filter(|row| !row.point.searched).count() as u64)
    }

    async fn count_total(&self) -> Result<u64> {
        let state = self.state.read().unwrap();
        Ok(state.samples.len() as u64)
    }

    async fn label_progress(&self) -> Result<Vec<LabelProgress>> {
        let state = self.state.read().unwrap();
        let mut by_label: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        for row in &state.samples {
            let entry = by_label.entry(row.point.label.as_str()).or_default();
            entry.0 += 1;
            if row.point.searched {
                entry.1 += 1;
            }
        }
        Ok(by_label
            .into_iter()
            .map(|(label, (total, searched))| LabelProgress {
                label: label.to_string(),
                total,
                searched,
            })
            .collect())
    }
}

#[async_trait]
impl PanoramaStore for MemoryStore {
    async fn upsert_panorama(&self, record: &PanoramaRecord) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.upsert(record);
        Ok(())
    }

    async fn get_panorama(&self, pano_id: &str) -> Result<Option<PanoramaRecord>> {
        let state = self.state.read().unwrap();
        Ok(state.panoramas.get(pano_id).cloned())
    }

    async fn list_panoramas(&self) -> Result<Vec<PanoramaRecord>> {
        let state = self.state.read().unwrap();
        Ok(state.panoramas.values().cloned().collect())
    }

    async fn count_panoramas(&self) -> Result<u64> {
        let state = self.state.read().unwrap();
        Ok(state.panoramas.len() as u64)
    }

    async fn count_complete_metadata(&self) -> Result<u64> {
        let state = self.state.read().unwrap();
        Ok(state.panoramas.values().filter(|p| p.has_complete_metadata()).count() as u64)
    }
}

#[async_trait]
impl DiscoveryStore for MemoryStore {
    async fn record_found(&self, id: SampleId, record: &PanoramaRecord) -> Result<()> {
        let mut state = self.state.write().unwrap();
        // Resolve the row first so a bad id leaves the panorama table untouched
        state.row_mut(id)?;
        state.upsert(record);
        let row = state.row_mut(id)?;
        row.point.searched = true;
        row.claim = None;
        Ok(())
    }
}
