use crate::config::RetrievalConfig;
use crate::dispatch::{DispatchPlan, is_blank};
use crate::error::{Result, RetrievalError};
use crate::hybrid::HybridTextFilter;
use crate::request::RetrievalRequest;
use crate::result::{Match, QueryResultSet, RetrievalResponse, TemporalGroup};
use crate::temporal::group_temporal;
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use vidrecall_embeddings::EmbeddingProvider;
use vidrecall_vector_index::{FilterPredicate, VectorIndex};

/// Keyframe retrieval over a vector index.
///
/// Built once at startup and shared by reference. Retrieval calls never
/// fail: upstream errors and timeouts are logged and degrade to empty
/// results.
pub struct RetrievalEngine {
    config: RetrievalConfig,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    hybrid: Option<HybridTextFilter>,
}

impl RetrievalEngine {
    pub fn new(
        config: RetrievalConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        info!(
            "Initializing retrieval engine (embedding dimension {})",
            embedder.dimension()
        );

        Ok(Self {
            config,
            index,
            embedder,
            hybrid: None,
        })
    }

    /// Enable secondary-language narrowing of flat results
    pub fn with_hybrid_filter(mut self, filter: HybridTextFilter) -> Self {
        self.hybrid = Some(filter);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn has_hybrid_filter(&self) -> bool {
        self.hybrid.is_some()
    }

    /// Route a request to the single-query, filter-only or temporal path
    pub async fn retrieve(&self, request: &RetrievalRequest) -> RetrievalResponse {
        let start = Instant::now();
        let predicate = request.filters.predicate();
        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        let has_scope = predicate.as_ref().is_some_and(FilterPredicate::has_scope);
        let plan = DispatchPlan::from_queries(&request.queries, has_scope);
        debug!("Dispatching {} queries to the {} path", request.queries.len(), plan.name());

        let response = match plan {
            DispatchPlan::Empty => {
                warn!("Retrieval request has no usable query and no pack or video filter");
                RetrievalResponse::Empty
            }
            DispatchPlan::FilterOnly => RetrievalResponse::FilterOnly {
                results: self.retrieve_by_filter_only(predicate.as_ref(), top_k).await,
            },
            DispatchPlan::Single(query) => RetrievalResponse::Ranked {
                results: self.retrieve_single(&query, top_k, predicate.as_ref()).await,
            },
            DispatchPlan::Temporal(queries) => {
                let top_k_per_query = request
                    .top_k_per_query
                    .unwrap_or(self.config.default_top_k_per_query);
                RetrievalResponse::Temporal {
                    results: self
                        .retrieve_temporal(&queries, top_k, top_k_per_query, predicate.as_ref())
                        .await,
                }
            }
        };

        let response = self.narrow_by_language(request, top_k, response).await;

        info!(
            "Retrieval completed in {}ms, returned {} results",
            start.elapsed().as_millis(),
            response.len()
        );
        response
    }

    /// [`Self::retrieve`], abandoned as soon as `cancel` fires.
    ///
    /// In-flight searches are dropped and nothing computed so far is
    /// returned.
    pub async fn retrieve_with_cancel(
        &self,
        request: &RetrievalRequest,
        cancel: &CancellationToken,
    ) -> RetrievalResponse {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Retrieval cancelled; discarding partial results");
                RetrievalResponse::Empty
            }
            response = self.retrieve(request) => response,
        }
    }

    /// Nearest keyframes for one query, in the index's descending score order
    pub async fn retrieve_single(
        &self,
        query: &str,
        top_k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Vec<Match> {
        if is_blank(query) {
            warn!("Empty query passed to single-query retrieval");
            return Vec::new();
        }

        match self.search(query, top_k, predicate).await {
            Ok(matches) => matches,
            Err(err) => {
                error!("Single-query retrieval for '{query}' failed: {err}");
                Vec::new()
            }
        }
    }

    /// Unranked keyframes matching `predicate`, every score 1.0
    pub async fn retrieve_by_filter_only(
        &self,
        predicate: Option<&FilterPredicate>,
        limit: usize,
    ) -> Vec<Match> {
        let scrolled = self
            .bounded("index scroll", self.index.scroll_all(predicate, limit))
            .await;

        match scrolled {
            Ok(hits) => {
                debug!("Filter-only scroll returned {} keyframes", hits.len());
                hits.into_iter().map(Match::from).collect()
            }
            Err(err) => {
                error!("Filter-only retrieval failed: {err}");
                Vec::new()
            }
        }
    }

    /// Videos that match every query, with per-query keyframe buckets.
    ///
    /// Each query over-fetches `top_k * over_fetch_factor` candidates. All
    /// searches run concurrently and all are awaited; a failed search counts
    /// as an empty result set and so empties the intersection.
    pub async fn retrieve_temporal(
        &self,
        queries: &[String],
        top_k: usize,
        top_k_per_query: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Vec<TemporalGroup> {
        let candidates = self.config.temporal_candidates(top_k);
        debug!(
            "Temporal retrieval: {} queries, {candidates} candidates each",
            queries.len()
        );

        let searches = queries.iter().map(|query| async move {
            let matches = match self.search(query, candidates, predicate).await {
                Ok(matches) => matches,
                Err(err) => {
                    error!("Temporal sub-query '{query}' failed: {err}");
                    Vec::new()
                }
            };
            QueryResultSet::new(query.as_str(), matches)
        });
        let result_sets = join_all(searches).await;

        let groups = group_temporal(&result_sets, top_k_per_query);
        if groups.is_empty() {
            info!("No video matched all {} temporal queries", queries.len());
        }
        groups
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Result<Vec<Match>> {
        let vector = self.bounded("query embedding", self.embedder.encode(query)).await?;
        let hits = self
            .bounded(
                "vector search",
                self.index.search_similar(&vector, top_k, predicate),
            )
            .await?;

        debug!("'{query}' matched {} keyframes", hits.len());
        Ok(hits.into_iter().map(Match::from).collect())
    }

    /// Run an upstream call under the configured timeout
    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T>
    where
        E: Into<RetrievalError>,
    {
        match tokio::time::timeout(self.config.upstream_timeout(), call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(RetrievalError::Timeout {
                operation,
                timeout_ms: self.config.upstream_timeout_ms,
            }),
        }
    }

    async fn narrow_by_language(
        &self,
        request: &RetrievalRequest,
        top_k: usize,
        response: RetrievalResponse,
    ) -> RetrievalResponse {
        let Some(language_query) = request.language_query.as_deref().filter(|q| !is_blank(q))
        else {
            return response;
        };
        let Some(filter) = &self.hybrid else {
            warn!("Language query supplied but no hybrid text filter is configured");
            return response;
        };

        match response {
            RetrievalResponse::Ranked { results } => RetrievalResponse::Ranked {
                results: self.narrow(filter, language_query, &results, top_k).await,
            },
            RetrievalResponse::FilterOnly { results } => RetrievalResponse::FilterOnly {
                results: self.narrow(filter, language_query, &results, top_k).await,
            },
            other => other,
        }
    }

    async fn narrow(
        &self,
        filter: &HybridTextFilter,
        language_query: &str,
        results: &[Match],
        top_k: usize,
    ) -> Vec<Match> {
        let narrowed = self
            .bounded(
                "hybrid text filter",
                filter.try_narrow(language_query, results, top_k),
            )
            .await;

        match narrowed {
            Ok(matches) => matches,
            Err(err) => {
                error!("Hybrid text filter for '{language_query}' failed: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vidrecall_embeddings::EmbeddingError;
    use vidrecall_vector_index::{KeyframeHit, VectorIndexError};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn encode(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == "boom" {
                return Err(EmbeddingError::EmbeddingGeneration("model crashed".into()));
            }
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct SingleHitIndex;

    #[async_trait]
    impl VectorIndex for SingleHitIndex {
        async fn search_similar(
            &self,
            _vector: &[f32],
            top_k: usize,
            _predicate: Option<&FilterPredicate>,
        ) -> vidrecall_vector_index::Result<Vec<KeyframeHit>> {
            Ok(vec![KeyframeHit {
                pack: "K01".to_string(),
                video: "V001".to_string(),
                frame: "001".to_string(),
                frame_index: 0,
                score: 0.9,
            }]
            .into_iter()
            .take(top_k)
            .collect())
        }

        async fn scroll_all(
            &self,
            _predicate: Option<&FilterPredicate>,
            _limit: usize,
        ) -> vidrecall_vector_index::Result<Vec<KeyframeHit>> {
            Err(VectorIndexError::ScrollFailed("unavailable".into()))
        }
    }

    fn engine() -> (RetrievalEngine, Arc<CountingEmbedder>) {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = RetrievalEngine::new(
            RetrievalConfig::default(),
            Arc::new(SingleHitIndex),
            embedder.clone(),
        )
        .unwrap();
        (engine, embedder)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RetrievalConfig {
            over_fetch_factor: 0,
            ..Default::default()
        };
        let result = RetrievalEngine::new(
            config,
            Arc::new(SingleHitIndex),
            Arc::new(CountingEmbedder {
                calls: AtomicUsize::new(0),
            }),
        );
        assert!(matches!(result, Err(RetrievalError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let (engine, embedder) = engine();
        assert!(engine.retrieve_single("   ", 10, None).await.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_empty() {
        let (engine, _) = engine();
        assert!(engine.retrieve_single("boom", 10, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_scroll_failure_is_empty() {
        let (engine, _) = engine();
        assert!(engine.retrieve_by_filter_only(None, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_single_hit_maps_to_match() {
        let (engine, _) = engine();
        let matches = engine.retrieve_single("cat", 10, None).await;
        assert_eq!(
            matches,
            vec![Match {
                video_id: "K01_V001".to_string(),
                frame: "001".to_string(),
                frame_index: 0,
                score: 0.9,
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_sub_query_empties_temporal_result() {
        let (engine, embedder) = engine();
        let queries = vec!["cat".to_string(), "boom".to_string()];
        assert!(engine.retrieve_temporal(&queries, 10, 3, None).await.is_empty());
        // Both sub-queries ran even though one failed
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_language_query_without_filter_is_ignored() {
        let (engine, _) = engine();
        let request = RetrievalRequest::new(["cat"]).with_language_query("con mèo");
        let response = engine.retrieve(&request).await;
        assert_eq!(response.len(), 1);
        assert!(!engine.has_hybrid_filter());
    }
}
