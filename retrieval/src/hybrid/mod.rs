//! Secondary-language narrowing of flat results through a hybrid text index.

mod weaviate;

pub use weaviate::{WeaviateConfig, WeaviateHybridClient};

use crate::dispatch::is_blank;
use crate::error::Result;
use crate::result::{Match, sort_by_score_desc};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use vidrecall_embeddings::EmbeddingProvider;

/// Video-level hybrid (keyword + vector) search restricted to a candidate set
#[async_trait]
pub trait HybridTextSearch: Send + Sync {
    /// Score the candidate videos against `query_text`.
    ///
    /// Videos missing from the returned map did not match.
    async fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: &[f32],
        candidate_video_ids: &BTreeSet<String>,
        top_k: usize,
    ) -> Result<HashMap<String, f32>>;
}

/// Filters and re-ranks keyframe matches by the hybrid score of their video
#[derive(Clone)]
pub struct HybridTextFilter {
    backend: Arc<dyn HybridTextSearch>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridTextFilter {
    /// `embedder` encodes the secondary-language query and is usually a
    /// multilingual text model rather than the keyframe model.
    pub fn new(backend: Arc<dyn HybridTextSearch>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedder }
    }

    /// Keep only matches whose video the backend scored, re-scored with that
    /// video score, sorted descending and truncated to `top_k`.
    ///
    /// Never adds keyframes that were not in `matches`. Failures yield an
    /// empty result.
    pub async fn narrow(&self, query_text: &str, matches: &[Match], top_k: usize) -> Vec<Match> {
        match self.try_narrow(query_text, matches, top_k).await {
            Ok(narrowed) => narrowed,
            Err(err) => {
                error!("Hybrid text search failed for '{query_text}': {err}");
                Vec::new()
            }
        }
    }

    /// [`Self::narrow`] with the encoder or backend failure returned
    pub async fn try_narrow(
        &self,
        query_text: &str,
        matches: &[Match],
        top_k: usize,
    ) -> Result<Vec<Match>> {
        if is_blank(query_text) {
            return Ok(Vec::new());
        }

        let candidates = dedup_keyframes(matches);
        if candidates.is_empty() {
            warn!("Hybrid text filter received no candidate keyframes");
            return Ok(Vec::new());
        }

        let video_ids: BTreeSet<String> = candidates.iter().map(|m| m.video_id.clone()).collect();
        info!(
            "Hybrid text filter: '{query_text}' over {} keyframes from {} videos",
            candidates.len(),
            video_ids.len()
        );

        let scores = self.score_videos(query_text, &video_ids).await?;
        debug!("Hybrid backend scored {} videos", scores.len());

        let mut narrowed: Vec<Match> = candidates
            .into_iter()
            .filter_map(|m| {
                let score = *scores.get(&m.video_id)?;
                Some(Match { score, ..m })
            })
            .collect();

        sort_by_score_desc(&mut narrowed);
        narrowed.truncate(top_k);
        Ok(narrowed)
    }

    async fn score_videos(
        &self,
        query_text: &str,
        video_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, f32>> {
        let vector = self.embedder.encode(query_text).await?;
        self.backend
            .hybrid_search(query_text, &vector, video_ids, video_ids.len())
            .await
    }
}

/// First occurrence of each (video, frame, frame index) triple, in input order
fn dedup_keyframes(matches: &[Match]) -> Vec<Match> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|&m| seen.insert((m.video_id.as_str(), m.frame.as_str(), m.frame_index)))
        .cloned()
        .collect()
}
