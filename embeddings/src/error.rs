use thiserror::Error;

/// Errors that can occur while turning query text into vectors
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// Invalid input provided to the encoder
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error("Embedding error: {0}")]
    Other(String),
}
