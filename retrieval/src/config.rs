use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the retrieval engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Result count used when a request does not set `top_k`
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Per-query bucket size used when a temporal request does not set one
    #[serde(default = "default_top_k_per_query")]
    pub default_top_k_per_query: usize,

    /// Multiplier on `top_k` for each sub-query of a temporal search.
    /// Larger values find more videos shared by every sub-query at the cost of index load.
    #[serde(default = "default_over_fetch_factor")]
    pub over_fetch_factor: usize,

    /// Upper bound on a single embedding or index call
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
}

fn default_top_k() -> usize {
    100
}

fn default_top_k_per_query() -> usize {
    10
}

fn default_over_fetch_factor() -> usize {
    5
}

fn default_upstream_timeout_ms() -> u64 {
    60_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_top_k_per_query: default_top_k_per_query(),
            over_fetch_factor: default_over_fetch_factor(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_top_k == 0 {
            return Err("default_top_k must be > 0".to_string());
        }

        if self.default_top_k_per_query == 0 {
            return Err("default_top_k_per_query must be > 0".to_string());
        }

        if self.over_fetch_factor == 0 {
            return Err("over_fetch_factor must be > 0".to_string());
        }

        if self.upstream_timeout_ms == 0 {
            return Err("upstream_timeout_ms must be > 0".to_string());
        }

        Ok(())
    }

    /// Candidates requested per sub-query of a temporal search
    pub fn temporal_candidates(&self, top_k: usize) -> usize {
        top_k.saturating_mul(self.over_fetch_factor)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}
