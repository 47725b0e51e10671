//! Error types for Panosweep

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanosweepError {
    // Geometry errors
    #[error("Invalid geometry for boundary '{label}': {reason}")]
    InvalidGeometry { label: String, reason: String },

    #[error("Degenerate bounding box: {reason}")]
    DegenerateBounds { reason: String },

    #[error("Invalid lattice spacing {spacing}: must be finite and greater than zero")]
    InvalidSpacing { spacing: f64 },

    // Store errors
    #[error("Sample point {id} not found")]
    SampleNotFound { id: i64 },

    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PanosweepError {
    /// Whether the error only concerns a single boundary and the run can
    /// move on to the next one.
    pub fn is_geometry_error(&self) -> bool {
        matches!(
            self,
            PanosweepError::InvalidGeometry { .. }
                | PanosweepError::DegenerateBounds { .. }
                | PanosweepError::InvalidSpacing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PanosweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_errors_are_per_boundary() {
        let err = PanosweepError::InvalidGeometry {
            label: "Mission".to_string(),
            reason: "ring too short".to_string(),
        };
        assert!(err.is_geometry_error());
        assert!(PanosweepError::InvalidSpacing { spacing: 0.0 }.is_geometry_error());
        assert!(!PanosweepError::Storage("disk full".to_string()).is_geometry_error());
    }

    #[test]
    fn test_error_messages() {
        let err = PanosweepError::SampleNotFound { id: 42 };
        assert_eq!(err.to_string(), "Sample point 42 not found");

        let err = PanosweepError::DegenerateBounds { reason: "min_x >= max_x".to_string() };
        assert_eq!(err.to_string(), "Degenerate bounding box: min_x >= max_x");
    }
}
