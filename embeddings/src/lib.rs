//! # Vidrecall Embeddings
//!
//! Text encoders for keyframe retrieval. Query text is encoded into the same
//! space as the indexed keyframe vectors (CLIP ViT-B/32), and secondary-language
//! queries can use a multilingual sentence model.
//!
//! The [`EmbeddingProvider`] trait is the seam the retrieval engine consumes;
//! [`EmbeddingService`] is the fastembed-backed implementation.
//!
//! ## Example
//!
//! ```no_run
//! use vidrecall_embeddings::{EmbeddingProvider, EmbeddingService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = EmbeddingService::new()?;
//!     let vector = service.encode("a red car turning left").await?;
//!     println!("Encoded into {} dimensions", vector.len());
//!     Ok(())
//! }
//! ```

mod error;
mod provider;
mod service;

pub use error::EmbeddingError;
pub use provider::{EmbeddingProvider, run_blocking};
pub use service::{EmbeddingConfig, EmbeddingModelType, EmbeddingService};

/// Output dimension of the CLIP ViT-B/32 text tower
pub const CLIP_EMBEDDING_DIM: usize = 512;

/// Output dimension of paraphrase-multilingual-MiniLM-L12-v2
pub const MULTILINGUAL_EMBEDDING_DIM: usize = 384;
