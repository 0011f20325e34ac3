//! Intersection and per-query grouping for temporal searches.
//!
//! A video survives only if every sub-query surfaced it, and it is emitted
//! only if each of its per-query buckets ends up non-empty.

use crate::result::{Match, QueryBucket, QueryResultSet, TemporalGroup, sort_by_score_desc};
use std::collections::{HashMap, HashSet};

/// Group per-query result sets into videos that matched every query.
///
/// Groups come out in the order their video first appears in the first
/// result set. Buckets keep request order.
pub fn group_temporal(result_sets: &[QueryResultSet], top_k_per_query: usize) -> Vec<TemporalGroup> {
    let common = common_video_ids(result_sets);
    if common.is_empty() {
        return Vec::new();
    }
    bucket_common_videos(result_sets, &common, top_k_per_query)
}

/// Video ids present in every result set. Empty when there are no sets.
pub fn common_video_ids(result_sets: &[QueryResultSet]) -> HashSet<String> {
    let Some((first, rest)) = result_sets.split_first() else {
        return HashSet::new();
    };

    let mut common: HashSet<String> = first.matches.iter().map(|m| m.video_id.clone()).collect();
    for set in rest {
        let ids: HashSet<&str> = set.matches.iter().map(|m| m.video_id.as_str()).collect();
        common.retain(|id| ids.contains(id.as_str()));
        if common.is_empty() {
            break;
        }
    }
    common
}

/// Fill per-query buckets for the `common` videos and keep the complete ones.
///
/// Each bucket takes the first `top_k_per_query` matches in the order the
/// index returned them, then is re-sorted by descending score.
pub fn bucket_common_videos(
    result_sets: &[QueryResultSet],
    common: &HashSet<String>,
    top_k_per_query: usize,
) -> Vec<TemporalGroup> {
    let query_count = result_sets.len();
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<Vec<Match>>> = HashMap::new();

    for (position, set) in result_sets.iter().enumerate() {
        for m in &set.matches {
            if !common.contains(&m.video_id) {
                continue;
            }
            let per_query = buckets.entry(m.video_id.as_str()).or_insert_with(|| {
                order.push(m.video_id.as_str());
                vec![Vec::new(); query_count]
            });
            let bucket = &mut per_query[position];
            if bucket.len() < top_k_per_query {
                bucket.push(m.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|video_id| {
            let per_query = buckets.remove(video_id)?;
            if per_query.iter().any(Vec::is_empty) {
                return None;
            }
            let query_results = per_query
                .into_iter()
                .zip(result_sets)
                .map(|(mut keyframes, set)| {
                    sort_by_score_desc(&mut keyframes);
                    QueryBucket {
                        query: set.query.clone(),
                        keyframes,
                    }
                })
                .collect();
            Some(TemporalGroup {
                video_id: video_id.to_string(),
                query_results,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hit(video_id: &str, frame: &str, score: f32) -> Match {
        Match {
            video_id: video_id.to_string(),
            frame: frame.to_string(),
            frame_index: 0,
            score,
        }
    }

    fn scores(bucket: &QueryBucket) -> Vec<f32> {
        bucket.keyframes.iter().map(|m| m.score).collect()
    }

    #[test]
    fn test_disjoint_sets_yield_nothing() {
        let sets = vec![
            QueryResultSet::new("cat", vec![hit("K01_V001", "001", 0.9)]),
            QueryResultSet::new("dog", vec![hit("K01_V002", "001", 0.8)]),
        ];
        assert!(group_temporal(&sets, 3).is_empty());
    }

    #[test]
    fn test_empty_set_empties_intersection() {
        let sets = vec![
            QueryResultSet::new("cat", vec![hit("K01_V001", "001", 0.9)]),
            QueryResultSet::new("dog", Vec::new()),
        ];
        assert!(common_video_ids(&sets).is_empty());
        assert!(group_temporal(&sets, 3).is_empty());
        assert!(group_temporal(&[], 3).is_empty());
    }

    #[test]
    fn test_shared_video_buckets() {
        let sets = vec![
            QueryResultSet::new(
                "cat",
                vec![
                    hit("K01_V001", "001", 0.9),
                    hit("K01_V002", "004", 0.85),
                    hit("K01_V001", "002", 0.8),
                    hit("K01_V001", "003", 0.7),
                    hit("K01_V001", "004", 0.6),
                ],
            ),
            QueryResultSet::new(
                "dog",
                vec![hit("K01_V003", "001", 0.95), hit("K01_V001", "010", 0.5)],
            ),
        ];

        let groups = group_temporal(&sets, 3);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.video_id, "K01_V001");
        assert_eq!(group.query_results[0].query, "cat");
        assert_eq!(scores(&group.query_results[0]), vec![0.9, 0.8, 0.7]);
        assert_eq!(group.query_results[1].query, "dog");
        assert_eq!(scores(&group.query_results[1]), vec![0.5]);
    }

    #[test]
    fn test_cap_is_prefix_of_index_order_then_sorted() {
        // Index order deliberately not score-descending
        let sets = vec![
            QueryResultSet::new(
                "cat",
                vec![
                    hit("K01_V001", "001", 0.2),
                    hit("K01_V001", "002", 0.6),
                    hit("K01_V001", "003", 0.9),
                ],
            ),
            QueryResultSet::new("dog", vec![hit("K01_V001", "009", 0.4)]),
        ];

        let groups = group_temporal(&sets, 2);
        let frames: Vec<_> = groups[0].query_results[0]
            .keyframes
            .iter()
            .map(|m| m.frame.as_str())
            .collect();
        assert_eq!(frames, vec!["002", "001"]);
    }

    #[test]
    fn test_incomplete_buckets_are_dropped() {
        let full = vec![
            QueryResultSet::new(
                "cat",
                vec![hit("K01_V001", "001", 0.9), hit("K01_V002", "001", 0.8)],
            ),
            QueryResultSet::new(
                "dog",
                vec![hit("K01_V002", "005", 0.7), hit("K01_V001", "006", 0.6)],
            ),
        ];
        let common = common_video_ids(&full);
        assert_eq!(common.len(), 2);

        // The "dog" set is truncated after the intersection was computed, so
        // K01_V001 is in the intersection but has no "dog" keyframes
        let mut truncated = full.clone();
        truncated[1].matches.truncate(1);

        let groups = bucket_common_videos(&truncated, &common, 3);
        let videos: Vec<_> = groups.iter().map(|g| g.video_id.as_str()).collect();
        assert_eq!(videos, vec!["K01_V002"]);
    }

    #[test]
    fn test_zero_bucket_size_emits_nothing() {
        let sets = vec![
            QueryResultSet::new("cat", vec![hit("K01_V001", "001", 0.9)]),
            QueryResultSet::new("dog", vec![hit("K01_V001", "002", 0.8)]),
        ];
        assert!(group_temporal(&sets, 0).is_empty());
    }

    #[test]
    fn test_repeated_query_text_gets_one_bucket_per_position() {
        let sets = vec![
            QueryResultSet::new("cat", vec![hit("K01_V001", "001", 0.9)]),
            QueryResultSet::new("cat", vec![hit("K01_V001", "001", 0.9)]),
        ];
        let groups = group_temporal(&sets, 3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].query_results.len(), 2);
        // Lookup by text reaches only the first of the two buckets
        let first = groups[0].bucket("cat").unwrap();
        assert!(std::ptr::eq(first, &groups[0].query_results[0]));
    }

    #[test]
    fn test_groups_follow_first_set_order() {
        let sets = vec![
            QueryResultSet::new(
                "cat",
                vec![hit("K02_V007", "001", 0.9), hit("K01_V001", "001", 0.8)],
            ),
            QueryResultSet::new(
                "dog",
                vec![hit("K01_V001", "003", 0.9), hit("K02_V007", "002", 0.5)],
            ),
        ];
        let videos: Vec<_> = group_temporal(&sets, 3)
            .into_iter()
            .map(|g| g.video_id)
            .collect();
        assert_eq!(videos, vec!["K02_V007", "K01_V001"]);
    }
}
