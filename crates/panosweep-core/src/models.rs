pub mod boundary;
pub mod panorama;
pub mod sample;
pub mod throughput;

pub use boundary::Boundary;
pub use panorama::PanoramaRecord;
pub use sample::{ClaimToken, LabelProgress, LatLon, SampleId, SamplePoint};
pub use throughput::Throughput;
