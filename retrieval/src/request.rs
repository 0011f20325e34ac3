use serde::{Deserialize, Serialize};
use vidrecall_vector_index::FilterPredicate;

/// Catalog scoping criteria supplied with a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilters {
    /// Allowed packs (`K01`, `L21`, ...)
    #[serde(default)]
    pub packs: Vec<String>,

    /// Allowed videos as `pack_video` ids
    #[serde(default)]
    pub videos: Vec<String>,

    /// Excluded videos as `pack_video` ids
    #[serde(default)]
    pub excluded_videos: Vec<String>,
}

impl CatalogFilters {
    /// Build the index predicate; `None` means no filter
    pub fn predicate(&self) -> Option<FilterPredicate> {
        FilterPredicate::build(&self.packs, &self.videos, &self.excluded_videos)
    }

    /// True when no criterion was supplied at all, malformed or not
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty() && self.videos.is_empty() && self.excluded_videos.is_empty()
    }
}

/// A retrieval request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Query strings; two or more non-empty entries make a temporal search
    #[serde(default)]
    pub queries: Vec<String>,

    /// Result count; falls back to the engine default
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Per-query bucket size for temporal searches; falls back to the engine default
    #[serde(default)]
    pub top_k_per_query: Option<usize>,

    #[serde(default)]
    pub filters: CatalogFilters,

    /// Secondary-language query used to narrow flat results through the hybrid text index
    #[serde(default)]
    pub language_query: Option<String>,
}

impl RetrievalRequest {
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_top_k_per_query(mut self, top_k_per_query: usize) -> Self {
        self.top_k_per_query = Some(top_k_per_query);
        self
    }

    pub fn with_filters(mut self, filters: CatalogFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_language_query(mut self, query: impl Into<String>) -> Self {
        self.language_query = Some(query.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_filters_have_no_predicate() {
        assert_eq!(CatalogFilters::default().predicate(), None);
        assert!(CatalogFilters::default().is_empty());
    }

    #[test]
    fn test_malformed_only_filters_have_no_predicate() {
        let filters = CatalogFilters {
            videos: vec!["K01V001".to_string()],
            ..Default::default()
        };
        assert!(!filters.is_empty());
        assert_eq!(filters.predicate(), None);
    }

    #[test]
    fn test_exclusion_only_filters_have_predicate() {
        let filters = CatalogFilters {
            excluded_videos: vec!["K01_V001".to_string()],
            ..Default::default()
        };
        assert!(filters.predicate().is_some());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: RetrievalRequest =
            serde_json::from_str(r#"{"queries": ["red car"], "filters": {"packs": ["K01"]}}"#)
                .unwrap();
        assert_eq!(request.queries, vec!["red car"]);
        assert_eq!(request.top_k, None);
        assert_eq!(request.filters.packs, vec!["K01"]);
        assert!(request.filters.videos.is_empty());
        assert_eq!(request.language_query, None);
    }

    #[test]
    fn test_builder() {
        let request = RetrievalRequest::new(["red car", "person walking"])
            .with_top_k(50)
            .with_top_k_per_query(5)
            .with_language_query("xe màu đỏ");
        assert_eq!(request.queries.len(), 2);
        assert_eq!(request.top_k, Some(50));
        assert_eq!(request.top_k_per_query, Some(5));
        assert_eq!(request.language_query.as_deref(), Some("xe màu đỏ"));
    }
}
