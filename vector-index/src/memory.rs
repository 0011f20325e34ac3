use crate::error::{Result, VectorIndexError};
use crate::filter::FilterPredicate;
use crate::index::VectorIndex;
use crate::record::{KeyframeHit, KeyframeRecord, UNRANKED_SCORE};
use async_trait::async_trait;
use log::debug;
use std::cmp::Ordering;
use tokio::sync::RwLock;

/// In-memory keyframe index using brute-force cosine similarity
pub struct MemoryKeyframeIndex {
    dimension: usize,
    records: RwLock<Vec<KeyframeRecord>>,
}

impl MemoryKeyframeIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Add keyframes. Rejects the whole batch if any vector has the wrong dimension.
    pub async fn add_keyframes(&self, keyframes: Vec<KeyframeRecord>) -> Result<()> {
        if let Some(bad) = keyframes.iter().find(|k| k.vector.len() != self.dimension) {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let mut records = self.records.write().await;
        records.extend(keyframes);
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    fn admits(predicate: Option<&FilterPredicate>, record: &KeyframeRecord) -> bool {
        predicate.is_none_or(|p| p.matches(&record.pack, &record.video))
    }
}

#[async_trait]
impl VectorIndex for MemoryKeyframeIndex {
    async fn search_similar(
        &self,
        vector: &[f32],
        top_k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Result<Vec<KeyframeHit>> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        let mut scored: Vec<(usize, f32)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| Self::admits(predicate, record))
            .map(|(idx, record)| (idx, cosine_similarity(vector, &record.vector)))
            .collect();

        // Stable sort keeps insertion order between equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let hits: Vec<KeyframeHit> = scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| to_hit(&records[idx], score))
            .collect();

        debug!("Memory index search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn scroll_all(
        &self,
        predicate: Option<&FilterPredicate>,
        limit: usize,
    ) -> Result<Vec<KeyframeHit>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| Self::admits(predicate, record))
            .take(limit)
            .map(|record| to_hit(record, UNRANKED_SCORE))
            .collect())
    }
}

fn to_hit(record: &KeyframeRecord, score: f32) -> KeyframeHit {
    KeyframeHit {
        pack: record.pack.clone(),
        video: record.video.clone(),
        frame: record.frame.clone(),
        frame_index: record.frame_index,
        score,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
