use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] vidrecall_embeddings::EmbeddingError),

    #[error("Vector index error: {0}")]
    VectorIndex(#[from] vidrecall_vector_index::VectorIndexError),

    #[error("Hybrid text search error: {0}")]
    HybridSearch(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        RetrievalError::HybridSearch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
