//! # Vidrecall Vector Index
//!
//! Keyframe vector storage and the catalog predicates used to scope searches.
//!
//! - [`FilterPredicate`] turns pack / video / excluded-video criteria into a
//!   predicate, with `None` standing for "no filter".
//! - [`VectorIndex`] is the read contract consumed by the retrieval engine:
//!   ranked similarity search and unranked filter-only scrolling.
//! - [`LanceKeyframeIndex`] stores vectors in a LanceDB table and renders
//!   predicates as SQL; [`MemoryKeyframeIndex`] is a brute-force in-memory
//!   implementation for tests and small catalogs.
//!
//! ## Example
//!
//! ```no_run
//! use vidrecall_vector_index::{FilterPredicate, LanceIndexConfig, LanceKeyframeIndex, VectorIndex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = LanceKeyframeIndex::open(LanceIndexConfig::default()).await?;
//!     let predicate = FilterPredicate::build(&["K01"], &[] as &[&str], &["K01_V003"]);
//!     let hits = index.scroll_all(predicate.as_ref(), 20).await?;
//!     println!("{} keyframes in scope", hits.len());
//!     Ok(())
//! }
//! ```

mod error;
mod filter;
mod index;
mod lance;
mod memory;
mod record;

pub use error::{Result, VectorIndexError};
pub use filter::{FilterPredicate, VideoRef};
pub use index::VectorIndex;
pub use lance::{LanceIndexConfig, LanceKeyframeIndex};
pub use memory::MemoryKeyframeIndex;
pub use record::{
    KeyframeHit, KeyframeRecord, UNRANKED_SCORE, VIDEO_ID_SEPARATOR, join_video_id,
    split_video_id,
};
