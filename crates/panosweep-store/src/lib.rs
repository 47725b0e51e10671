//! Panosweep Store - Storage ports and adapters
//!
//! This crate defines the sample-queue and panorama storage ports and
//! provides an in-memory adapter and a SQLite adapter.

pub mod memory;
pub mod ports;
pub mod sqlite;

pub use memory::MemoryStore;
pub use ports::{DiscoveryStore, PanoramaStore, SampleStore};
pub use sqlite::{SqliteConfig, SqliteStore};
