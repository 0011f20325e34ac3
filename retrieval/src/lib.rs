/*!
# Keyframe Retrieval

Query orchestration over a keyframe vector index:

- **Single-query search**: encode the text, return the nearest keyframes
- **Filter-only scroll**: no usable query, browse the catalog by pack/video
- **Temporal search**: several queries describing consecutive moments; only
  videos that match *every* query are returned, grouped per query
- **Hybrid narrowing**: optionally re-rank flat results by a secondary-language
  query against a hybrid text index (Weaviate)

## Dispatch

```text
queries (blank entries dropped)
  ├─ 0, no scope     ─> empty
  ├─ 0, packs/videos ─> scroll_all(predicate)
  ├─ 1               ─> search_similar(encode(q), top_k)
  └─ 2+              ─> search_similar(encode(q_i), top_k * over_fetch) for each i, concurrently
                          └─> intersect video ids
                                └─> per-query buckets (≤ top_k_per_query)
```

## Failure model

Retrieval never returns an error. Embedding failures, index failures and
timeouts are logged and produce empty results. In temporal mode a failed
sub-query behaves like a query with no hits, so the intersection is empty.

## Example

```rust,no_run
use std::sync::Arc;
use vidrecall_embeddings::EmbeddingService;
use vidrecall_retrieval::{RetrievalConfig, RetrievalEngine, RetrievalRequest};
use vidrecall_vector_index::{LanceIndexConfig, LanceKeyframeIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let index = LanceKeyframeIndex::open(LanceIndexConfig::default()).await?;
    let embedder = EmbeddingService::new()?;
    let engine = RetrievalEngine::new(
        RetrievalConfig::default(),
        Arc::new(index),
        Arc::new(embedder),
    )?;

    let request = RetrievalRequest::new(["red car", "person walking"]).with_top_k_per_query(5);
    for group in engine.retrieve(&request).await.groups().unwrap_or_default() {
        println!("{} ({:.2})", group.video_id, group.aggregate_score());
    }
    Ok(())
}
```
*/

mod config;
mod dispatch;
mod engine;
mod error;
mod hybrid;
mod request;
mod result;
mod temporal;

pub use config::RetrievalConfig;
pub use dispatch::DispatchPlan;
pub use engine::RetrievalEngine;
pub use error::{Result, RetrievalError};
pub use hybrid::{HybridTextFilter, HybridTextSearch, WeaviateConfig, WeaviateHybridClient};
pub use request::{CatalogFilters, RetrievalRequest};
pub use result::{Match, QueryBucket, QueryResultSet, RetrievalResponse, TemporalGroup};
pub use temporal::{bucket_common_videos, common_video_ids, group_temporal};
