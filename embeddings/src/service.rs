use crate::error::EmbeddingError;
use crate::provider::{EmbeddingProvider, run_blocking};
use crate::{CLIP_EMBEDDING_DIM, MULTILINGUAL_EMBEDDING_DIM};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default = "default_model")]
    pub model: EmbeddingModelType,

    /// Target embedding dimension (truncates the model output when smaller)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show download progress when downloading models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_model() -> EmbeddingModelType {
    EmbeddingModelType::ClipVitB32
}

fn default_dimension() -> usize {
    CLIP_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            show_download_progress: false,
        }
    }
}

impl EmbeddingConfig {
    /// Config for the multilingual sentence model used by secondary-language queries
    pub fn multilingual() -> Self {
        Self {
            model: EmbeddingModelType::ParaphraseMultilingualMiniLmL12V2,
            dimension: MULTILINGUAL_EMBEDDING_DIM,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.dimension == 0 {
            return Err("dimension must be > 0".to_string());
        }

        let native = self.model.native_dimension();
        if self.dimension > native {
            return Err(format!(
                "dimension ({}) cannot exceed the native dimension of {:?} ({native})",
                self.dimension, self.model
            ));
        }

        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }

        Ok(())
    }
}

/// Supported embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingModelType {
    /// Text tower of CLIP ViT-B/32, shares a space with the keyframe image vectors
    ClipVitB32,
    /// paraphrase-multilingual-MiniLM-L12-v2
    ParaphraseMultilingualMiniLmL12V2,
}

impl EmbeddingModelType {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            EmbeddingModelType::ClipVitB32 => EmbeddingModel::ClipVitB32,
            EmbeddingModelType::ParaphraseMultilingualMiniLmL12V2 => {
                EmbeddingModel::ParaphraseMLMiniLML12V2
            }
        }
    }

    /// Output dimension of the model before truncation
    pub fn native_dimension(self) -> usize {
        match self {
            EmbeddingModelType::ClipVitB32 => CLIP_EMBEDDING_DIM,
            EmbeddingModelType::ParaphraseMultilingualMiniLmL12V2 => MULTILINGUAL_EMBEDDING_DIM,
        }
    }
}

/// Local text encoder backed by fastembed
pub struct EmbeddingService {
    model: Arc<TextEmbedding>,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    /// Create a new embedding service with default configuration
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_config(EmbeddingConfig::default())
    }

    /// Create a new embedding service with custom configuration
    pub fn with_config(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate().map_err(EmbeddingError::InvalidInput)?;

        info!(
            "Initializing embedding service with model {:?}, dimension {}",
            config.model, config.dimension
        );

        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        let model = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::ModelInitialization(format!("Failed to initialize model: {e}"))
        })?;

        info!("Embedding service initialized successfully");

        Ok(Self {
            model: Arc::new(model),
            config,
        })
    }

    /// Generate embeddings for a list of texts, one vector per input.
    ///
    /// Runs inference on the calling thread.
    pub fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        embed_batched(&self.model, &texts, &self.config)
    }

    /// Generate a single embedding for a text on the calling thread
    pub fn embed_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        single(embed_batched(&self.model, &[text.to_string()], &self.config)?)
    }

    /// Get the configuration of this service
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

fn embed_batched(
    model: &TextEmbedding,
    texts: &[String],
    config: &EmbeddingConfig,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    debug!("Generating embeddings for {} texts", texts.len());

    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in text_refs.chunks(config.batch_size) {
        let batch_embeddings = model
            .embed(chunk.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;

        for mut embedding in batch_embeddings {
            if embedding.len() > config.dimension {
                embedding.truncate(config.dimension);
            }
            all_embeddings.push(embedding);
        }
    }

    Ok(all_embeddings)
}

fn single(mut embeddings: Vec<Vec<f32>>) -> Result<Vec<f32>, EmbeddingError> {
    embeddings
        .pop()
        .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))
}

#[async_trait]
impl EmbeddingProvider for EmbeddingService {
    /// Inference runs on the blocking pool so the caller's timeout and
    /// cancellation stay effective.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "cannot encode empty text".to_string(),
            ));
        }

        let model = Arc::clone(&self.model);
        let config = self.config.clone();
        let texts = vec![text.to_string()];
        run_blocking(move || single(embed_batched(&model, &texts, &config)?)).await
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
