use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use vidrecall_vector_index::KeyframeHit;

/// One keyframe hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Composite `pack_video` id
    pub video_id: String,

    /// Frame label
    pub frame: String,

    /// Position of the frame in the video
    pub frame_index: u64,

    /// Similarity score, higher is better. 1.0 for filter-only results.
    pub score: f32,
}

impl From<KeyframeHit> for Match {
    fn from(hit: KeyframeHit) -> Self {
        Self {
            video_id: hit.video_id(),
            frame: hit.frame,
            frame_index: hit.frame_index,
            score: hit.score,
        }
    }
}

/// Sort matches by descending score, keeping the incoming order between ties
pub(crate) fn sort_by_score_desc(matches: &mut [Match]) {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Matches returned for one query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultSet {
    pub query: String,
    pub matches: Vec<Match>,
}

impl QueryResultSet {
    pub fn new(query: impl Into<String>, matches: Vec<Match>) -> Self {
        Self {
            query: query.into(),
            matches,
        }
    }
}

/// Keyframes of one video that matched one sub-query of a temporal search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBucket {
    pub query: String,
    pub keyframes: Vec<Match>,
}

/// A video that matched every sub-query of a temporal search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalGroup {
    pub video_id: String,

    /// One bucket per sub-query, in request order
    pub query_results: Vec<QueryBucket>,
}

impl TemporalGroup {
    /// First bucket for `query`.
    ///
    /// Buckets are per query position, so a request that repeats the same
    /// text has several buckets with that label and only the first is
    /// returned here. Index `query_results` by position to reach the others.
    pub fn bucket(&self, query: &str) -> Option<&QueryBucket> {
        self.query_results.iter().find(|b| b.query == query)
    }

    /// Sum of the best score in each bucket; useful for ranking groups
    pub fn aggregate_score(&self) -> f32 {
        self.query_results
            .iter()
            .filter_map(|b| b.keyframes.first())
            .map(|m| m.score)
            .sum()
    }
}

/// Outcome of a retrieval call, tagged with the path that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetrievalResponse {
    /// No usable query and no pack or video filter, or the request was cancelled
    Empty,

    /// Single-query similarity search, ordered by descending score
    Ranked { results: Vec<Match> },

    /// Filter-only scroll, unordered, every score is 1.0
    FilterOnly { results: Vec<Match> },

    /// Multi-query temporal search grouped by video
    Temporal { results: Vec<TemporalGroup> },
}

impl RetrievalResponse {
    /// Flat matches for the ranked and filter-only modes
    pub fn matches(&self) -> Option<&[Match]> {
        match self {
            RetrievalResponse::Ranked { results } | RetrievalResponse::FilterOnly { results } => {
                Some(results)
            }
            RetrievalResponse::Empty | RetrievalResponse::Temporal { .. } => None,
        }
    }

    /// Groups for the temporal mode
    pub fn groups(&self) -> Option<&[TemporalGroup]> {
        match self {
            RetrievalResponse::Temporal { results } => Some(results),
            _ => None,
        }
    }

    /// Number of top-level results (matches or groups)
    pub fn len(&self) -> usize {
        match self {
            RetrievalResponse::Empty => 0,
            RetrievalResponse::Ranked { results } | RetrievalResponse::FilterOnly { results } => {
                results.len()
            }
            RetrievalResponse::Temporal { results } => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keyframe(video_id: &str, frame: &str, score: f32) -> Match {
        Match {
            video_id: video_id.to_string(),
            frame: frame.to_string(),
            frame_index: 0,
            score,
        }
    }

    #[test]
    fn test_match_from_hit() {
        let hit = KeyframeHit {
            pack: "K01".to_string(),
            video: "V001".to_string(),
            frame: "007".to_string(),
            frame_index: 175,
            score: 0.31,
        };
        let m = Match::from(hit);
        assert_eq!(m.video_id, "K01_V001");
        assert_eq!(m.frame, "007");
        assert_eq!(m.frame_index, 175);
    }

    #[test]
    fn test_sort_is_stable_between_ties() {
        let mut matches = vec![
            keyframe("K01_V001", "a", 0.2),
            keyframe("K01_V001", "b", 0.5),
            keyframe("K01_V001", "c", 0.2),
        ];
        sort_by_score_desc(&mut matches);
        let frames: Vec<_> = matches.iter().map(|m| m.frame.as_str()).collect();
        assert_eq!(frames, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_response_is_tagged() {
        let response = RetrievalResponse::Ranked {
            results: vec![keyframe("K01_V001", "001", 0.9)],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "mode": "ranked",
                "results": [
                    {"video_id": "K01_V001", "frame": "001", "frame_index": 0, "score": 0.9f32}
                ]
            })
        );

        let value = serde_json::to_value(RetrievalResponse::Empty).unwrap();
        assert_eq!(value, json!({"mode": "empty"}));
    }

    #[test]
    fn test_response_accessors() {
        let group = TemporalGroup {
            video_id: "K01_V001".to_string(),
            query_results: vec![
                QueryBucket {
                    query: "red car".to_string(),
                    keyframes: vec![keyframe("K01_V001", "001", 0.5)],
                },
                QueryBucket {
                    query: "person walking".to_string(),
                    keyframes: vec![keyframe("K01_V001", "009", 0.25)],
                },
            ],
        };
        assert_eq!(group.aggregate_score(), 0.75);
        assert!(group.bucket("person walking").is_some());
        assert!(group.bucket("dog").is_none());

        let response = RetrievalResponse::Temporal {
            results: vec![group],
        };
        assert_eq!(response.len(), 1);
        assert!(response.matches().is_none());
        assert_eq!(response.groups().map(<[TemporalGroup]>::len), Some(1));
        assert!(RetrievalResponse::Empty.is_empty());
    }
}
