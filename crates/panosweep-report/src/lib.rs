//! Panosweep Report - Read-only views over the stores
//!
//! Progress metrics for polling and the flat TSV export of discovered
//! panoramas. Nothing here writes to either store.

pub mod export;
pub mod progress;

pub use export::{
    export_configured, export_rows, export_to_path, normalize_date, write_tsv, ExportRow,
    NULL_SENTINEL,
};
pub use progress::{Metric, ProgressCounts, ProgressReport, ProgressReporter};
