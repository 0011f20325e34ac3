use thiserror::Error;

/// Errors that can occur during vector index operations
#[derive(Debug, Error)]
pub enum VectorIndexError {
    /// Failed to open or create the index
    #[error("Failed to initialize vector index: {0}")]
    Initialization(String),

    /// Similarity search failed
    #[error("Failed to search: {0}")]
    SearchFailed(String),

    /// Filter-only scroll failed
    #[error("Failed to scroll: {0}")]
    ScrollFailed(String),

    /// Failed to add keyframes
    #[error("Failed to add keyframes: {0}")]
    AdditionFailed(String),

    /// Query or record vector does not match the index dimension
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lancedb::Error> for VectorIndexError {
    fn from(err: lancedb::Error) -> Self {
        VectorIndexError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VectorIndexError>;
