//! Completion, yield and metadata metrics over both stores.
//!
//! Each metric can be asked for on its own and only reads the counts it
//! needs. A zero denominator is reported as [`Metric::NoData`].

use panosweep_core::error::Result;
use panosweep_core::models::{LabelProgress, Throughput};
use panosweep_store::{PanoramaStore, SampleStore};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A derived quantity that may not be computable yet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NoData,
    Value(f64),
}

impl Metric {
    /// `numerator / denominator`, or `NoData` when the denominator is zero
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            Metric::NoData
        } else {
            Metric::Value(numerator as f64 / denominator as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::NoData => None,
            Metric::Value(v) => Some(*v),
        }
    }

    fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Metric::NoData => Metric::NoData,
            Metric::Value(v) => Metric::Value(f(v)),
        }
    }

    fn display(&self, scale: f64, precision: usize) -> String {
        match self {
            Metric::NoData => "n/a".to_string(),
            Metric::Value(v) => format!("{:.*}", precision, v * scale),
        }
    }
}

/// Raw counts the metrics are derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounts {
    pub total_points: u64,
    pub unsearched_points: u64,
    pub total_panoramas: u64,
    /// Panoramas with a non-empty date and copyright
    pub complete_metadata: u64,
}

impl ProgressCounts {
    pub fn searched_points(&self) -> u64 {
        self.total_points.saturating_sub(self.unsearched_points)
    }

    /// Searched points over all points
    pub fn point_progress(&self) -> Metric {
        Metric::ratio(self.searched_points(), self.total_points)
    }

    /// Panoramas found per searched point
    pub fn panorama_yield(&self) -> Metric {
        Metric::ratio(self.total_panoramas, self.searched_points())
    }

    /// Share of panoramas with both date and copyright
    pub fn metadata_completeness(&self) -> Metric {
        Metric::ratio(self.complete_metadata, self.total_panoramas)
    }

    /// Panorama count once every point is searched, assuming the yield so far
    /// holds for the remainder. An estimate only.
    pub fn expected_final_panoramas(&self) -> Metric {
        let total = self.total_points as f64;
        self.panorama_yield().map(|ratio| total * ratio)
    }
}

/// All metrics at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressReport {
    pub counts: ProgressCounts,
    pub point_progress: Metric,
    pub panorama_yield: Metric,
    pub metadata_completeness: Metric,
    pub expected_final_panoramas: Metric,
}

impl ProgressReport {
    pub fn from_counts(counts: ProgressCounts) -> Self {
        Self {
            counts,
            point_progress: counts.point_progress(),
            panorama_yield: counts.panorama_yield(),
            metadata_completeness: counts.metadata_completeness(),
            expected_final_panoramas: counts.expected_final_panoramas(),
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        writeln!(
            f,
            "Point Search Progress: {}% \t {}/{}",
            self.point_progress.display(100.0, 2),
            c.searched_points(),
            c.total_points
        )?;
        writeln!(
            f,
            "Found {} panoramas ({} pano per point)",
            c.total_panoramas,
            self.panorama_yield.display(1.0, 4)
        )?;
        writeln!(
            f,
            "Panorama Metadata Progress: {}% \t {}/{}",
            self.metadata_completeness.display(100.0, 2),
            c.complete_metadata,
            c.total_panoramas
        )?;
        write!(f, "Expected {} panoramas", self.expected_final_panoramas.display(1.0, 1))
    }
}

/// Pull-based metrics accessor over a store
pub struct ProgressReporter<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ProgressReporter<S>
where
    S: SampleStore + PanoramaStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn counts(&self) -> Result<ProgressCounts> {
        Ok(ProgressCounts {
            total_points: self.store.count_total().await?,
            unsearched_points: self.store.count_unsearched().await?,
            total_panoramas: self.store.count_panoramas().await?,
            complete_metadata: self.store.count_complete_metadata().await?,
        })
    }

    pub async fn snapshot(&self) -> Result<ProgressReport> {
        let report = ProgressReport::from_counts(self.counts().await?);
        tracing::debug!(
            searched = report.counts.searched_points(),
            total = report.counts.total_points,
            panoramas = report.counts.total_panoramas,
            "Progress snapshot"
        );
        Ok(report)
    }

    pub async fn point_progress(&self) -> Result<Metric> {
        Ok(self.point_counts().await?.point_progress())
    }

    pub async fn panorama_yield(&self) -> Result<Metric> {
        let mut counts = self.point_counts().await?;
        counts.total_panoramas = self.store.count_panoramas().await?;
        Ok(counts.panorama_yield())
    }

    pub async fn metadata_completeness(&self) -> Result<Metric> {
        let counts = ProgressCounts {
            total_panoramas: self.store.count_panoramas().await?,
            complete_metadata: self.store.count_complete_metadata().await?,
            ..Default::default()
        };
        Ok(counts.metadata_completeness())
    }

    pub async fn expected_final_panoramas(&self) -> Result<Metric> {
        let mut counts = self.point_counts().await?;
        counts.total_panoramas = self.store.count_panoramas().await?;
        Ok(counts.expected_final_panoramas())
    }

    /// Searched/total per region label
    pub async fn label_progress(&self) -> Result<Vec<LabelProgress>> {
        self.store.label_progress().await
    }

    /// Time left for the unsearched remainder at the given rate
    pub async fn eta(&self, throughput: Throughput) -> Result<Option<Duration>> {
        Ok(throughput.eta(self.store.count_unsearched().await?))
    }

    async fn point_counts(&self) -> Result<ProgressCounts> {
        Ok(ProgressCounts {
            total_points: self.store.count_total().await?,
            unsearched_points: self.store.count_unsearched().await?,
            ..Default::default()
        })
    }
}
