//! Panosweep Core - Domain models, errors, and configuration
//!
//! This crate contains the data model shared by the sampling engine, the
//! persistent work queue and the discovery workers.

pub mod config;
pub mod error;
pub mod models;

pub use error::{PanosweepError, Result};
