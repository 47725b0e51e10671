use async_trait::async_trait;
use panosweep_core::models::PanoramaRecord;
use std::sync::Arc;

use crate::error::LookupError;

/// Port for the external imagery service.
///
/// Given a coordinate, returns the nearest panorama within the service's own
/// search radius, `None` when there is none, or a transient error.
#[async_trait]
pub trait PanoramaLookup: Send + Sync {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<PanoramaRecord>, LookupError>;
}

#[async_trait]
impl<T: PanoramaLookup + ?Sized> PanoramaLookup for Arc<T> {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<PanoramaRecord>, LookupError> {
        (**self).lookup(lat, lon).await
    }
}
