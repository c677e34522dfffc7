use thiserror::Error;

/// Result type for heatsweep operations
pub type Result<T> = std::result::Result<T, HeatsweepError>;

/// Error types for heatsweep operations
#[derive(Error, Debug)]
pub enum HeatsweepError {
    /// Manifest loading or filtering error
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Checkpoint loading or validation error
    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    /// Image decoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Sweep configuration or geometry error
    #[error("Sweep error: {0}")]
    SweepError(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for HeatsweepError {
    fn from(s: String) -> Self {
        HeatsweepError::SweepError(s)
    }
}

impl From<&str> for HeatsweepError {
    fn from(s: &str) -> Self {
        HeatsweepError::SweepError(s.to_string())
    }
}
