use crate::error::Result;
use crate::filter::FilterPredicate;
use crate::record::KeyframeHit;
use async_trait::async_trait;

/// Read-side contract of a keyframe vector index.
///
/// `None` as predicate means "no filter".
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest keyframes to `vector`, ordered by descending score, at most `top_k`
    async fn search_similar(
        &self,
        vector: &[f32],
        top_k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Result<Vec<KeyframeHit>>;

    /// Keyframes matching `predicate` in no particular order, at most `limit`.
    /// Every hit carries [`crate::UNRANKED_SCORE`].
    async fn scroll_all(
        &self,
        predicate: Option<&FilterPredicate>,
        limit: usize,
    ) -> Result<Vec<KeyframeHit>>;
}
