//! Catalog predicates over the `pack` / `video` payload of indexed keyframes.
//!
//! A [`FilterPredicate`] is the logical AND of:
//!
//! - an optional pack clause (match any of the allowed packs),
//! - an optional video clause (OR over exact pack + video pairs),
//! - zero or more exclusion clauses (NOT pack + video, one per excluded pair).
//!
//! "No criteria" is represented by `None` at every API boundary, never by an
//! empty predicate, because an empty conjunction is read as "match nothing" by
//! some backends.

use crate::record::split_video_id;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub(crate) const PACK_COLUMN: &str = "pack";
pub(crate) const VIDEO_COLUMN: &str = "video";

/// Exact (pack, video) pair parsed from a composite video id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VideoRef {
    pub pack: String,
    pub video: String,
}

impl VideoRef {
    pub fn new(pack: impl Into<String>, video: impl Into<String>) -> Self {
        Self {
            pack: pack.into(),
            video: video.into(),
        }
    }

    /// Parse `pack_video`. Ids without a separator yield `None`.
    pub fn parse(video_id: &str) -> Option<Self> {
        split_video_id(video_id).map(|(pack, video)| Self::new(pack, video))
    }

    fn matches(&self, pack: &str, video: &str) -> bool {
        self.pack == pack && self.video == video
    }

    fn to_sql(&self) -> String {
        format!(
            "({PACK_COLUMN} = {} AND {VIDEO_COLUMN} = {})",
            sql_literal(&self.pack),
            sql_literal(&self.video)
        )
    }
}

/// Catalog predicate consumed by [`crate::VectorIndex`] search and scroll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Allowed packs; empty means no pack clause
    pub packs: BTreeSet<String>,
    /// Allowed exact videos; empty means no video clause
    pub videos: BTreeSet<VideoRef>,
    /// Excluded exact videos
    pub excluded: BTreeSet<VideoRef>,
}

impl FilterPredicate {
    /// Build a predicate from raw catalog criteria.
    ///
    /// `videos` and `excluded_videos` hold composite `pack_video` ids. Entries
    /// without a separator are dropped silently. Returns `None` when no clause
    /// survives, which callers must treat as "no filter".
    pub fn build<P, V, E>(packs: &[P], videos: &[V], excluded_videos: &[E]) -> Option<Self>
    where
        P: AsRef<str>,
        V: AsRef<str>,
        E: AsRef<str>,
    {
        let predicate = Self {
            packs: packs.iter().map(|p| p.as_ref().to_string()).collect(),
            videos: parse_refs(videos),
            excluded: parse_refs(excluded_videos),
        };

        if predicate.is_empty() {
            None
        } else {
            debug!(
                "Built filter predicate: {} packs, {} videos, {} exclusions",
                predicate.packs.len(),
                predicate.videos.len(),
                predicate.excluded.len()
            );
            Some(predicate)
        }
    }

    fn is_empty(&self) -> bool {
        self.packs.is_empty() && self.videos.is_empty() && self.excluded.is_empty()
    }

    /// Whether the predicate narrows the catalog to named packs or videos.
    ///
    /// Exclusions alone leave the rest of the catalog in scope.
    pub fn has_scope(&self) -> bool {
        !self.packs.is_empty() || !self.videos.is_empty()
    }

    /// Evaluate the predicate against one keyframe's catalog identity
    pub fn matches(&self, pack: &str, video: &str) -> bool {
        if !self.packs.is_empty() && !self.packs.contains(pack) {
            return false;
        }

        if !self.videos.is_empty() && !self.videos.iter().any(|v| v.matches(pack, video)) {
            return false;
        }

        !self.excluded.iter().any(|v| v.matches(pack, video))
    }

    /// Render as a SQL `WHERE` clause for LanceDB
    pub fn to_sql(&self) -> String {
        let mut clauses = Vec::new();

        if !self.packs.is_empty() {
            let packs = self
                .packs
                .iter()
                .map(|p| sql_literal(p))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("{PACK_COLUMN} IN ({packs})"));
        }

        if !self.videos.is_empty() {
            let pairs = self
                .videos
                .iter()
                .map(VideoRef::to_sql)
                .collect::<Vec<_>>()
                .join(" OR ");
            clauses.push(format!("({pairs})"));
        }

        for excluded in &self.excluded {
            clauses.push(format!("NOT {}", excluded.to_sql()));
        }

        clauses.join(" AND ")
    }
}

fn parse_refs<S: AsRef<str>>(ids: &[S]) -> BTreeSet<VideoRef> {
    ids.iter()
        .filter_map(|id| {
            let parsed = VideoRef::parse(id.as_ref());
            if parsed.is_none() {
                debug!("Ignoring video id without separator: '{}'", id.as_ref());
            }
            parsed
        })
        .collect()
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
