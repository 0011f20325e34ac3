use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use vidrecall_embeddings::EmbeddingConfig;
use vidrecall_retrieval::{RetrievalConfig, WeaviateConfig};
use vidrecall_vector_index::LanceIndexConfig;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "vidrecall.toml";

/// Top-level `vidrecall.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub index: LanceIndexConfig,

    /// Encoder for query text; must share a space with the indexed keyframe vectors
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Secondary-language narrowing; disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridConfig>,
}

/// `[hybrid]` section: a Weaviate endpoint plus the encoder for language queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    #[serde(flatten)]
    pub weaviate: WeaviateConfig,

    #[serde(default = "EmbeddingConfig::multilingual")]
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when `path` is `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                bail!("Config file not found: {}", path.display());
            }
            debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section and their consistency with each other
    pub fn validate(&self) -> Result<()> {
        self.index
            .validate()
            .map_err(|e| anyhow::anyhow!("[index] {e}"))?;
        self.embedding
            .validate()
            .map_err(|e| anyhow::anyhow!("[embedding] {e}"))?;
        self.retrieval
            .validate()
            .map_err(|e| anyhow::anyhow!("[retrieval] {e}"))?;

        if self.index.dimension != self.embedding.dimension {
            bail!(
                "[index] dimension ({}) does not match [embedding] dimension ({})",
                self.index.dimension,
                self.embedding.dimension
            );
        }

        if let Some(hybrid) = &self.hybrid {
            hybrid
                .weaviate
                .validate()
                .map_err(|e| anyhow::anyhow!("[hybrid] {e}"))?;
            hybrid
                .embedding
                .validate()
                .map_err(|e| anyhow::anyhow!("[hybrid.embedding] {e}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vidrecall_embeddings::EmbeddingModelType;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.index.table, "keyframe_collection");
        assert_eq!(config.embedding.model, EmbeddingModelType::ClipVitB32);
        assert_eq!(config.retrieval, RetrievalConfig::default());
        assert!(config.hybrid.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [index]
            path = "/data/aic/keyframes.lance"

            [retrieval]
            over_fetch_factor = 8
            upstream_timeout_ms = 5000

            [hybrid]
            url = "https://cluster.weaviate.cloud"
            alpha = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.index.path, PathBuf::from("/data/aic/keyframes.lance"));
        assert_eq!(config.index.dimension, 512);
        assert_eq!(config.retrieval.over_fetch_factor, 8);
        assert_eq!(config.retrieval.default_top_k, 100);

        let hybrid = config.hybrid.unwrap();
        assert_eq!(hybrid.weaviate.url, "https://cluster.weaviate.cloud");
        assert_eq!(hybrid.weaviate.alpha, 0.7);
        assert_eq!(hybrid.weaviate.class_name, "VideoText");
        assert_eq!(
            hybrid.embedding.model,
            EmbeddingModelType::ParaphraseMultilingualMiniLmL12V2
        );
        assert_eq!(hybrid.embedding.dimension, 384);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let config = AppConfig::from_toml(
            r#"
            [index]
            dimension = 768
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_invalid_section_is_named() {
        let config = AppConfig::from_toml(
            r#"
            [retrieval]
            default_top_k = 0
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("[retrieval]"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = AppConfig::default();
        config.hybrid = Some(HybridConfig {
            weaviate: WeaviateConfig::new("http://localhost:8080"),
            embedding: EmbeddingConfig::multilingual(),
        });

        let raw = config.to_toml().unwrap();
        let reloaded = AppConfig::from_toml(&raw).unwrap();
        assert_eq!(reloaded.retrieval, config.retrieval);
        assert_eq!(
            reloaded.hybrid.map(|h| h.weaviate),
            Some(WeaviateConfig::new("http://localhost:8080"))
        );
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
