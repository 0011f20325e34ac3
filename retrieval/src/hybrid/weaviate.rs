use super::HybridTextSearch;
use crate::error::{Result, RetrievalError};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const VIDEO_ID_PROPERTY: &str = "video_id";

/// Connection and query settings for a Weaviate hybrid text index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaviateConfig {
    /// Base URL of the Weaviate instance, e.g. `https://cluster.weaviate.cloud`
    pub url: String,

    /// Class holding one text document per video
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Keyword/vector balance: 0.0 is pure BM25, 1.0 is pure vector
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Text properties searched by the keyword half
    #[serde(default = "default_properties")]
    pub properties: Vec<String>,

    /// Environment variable holding the API key; `None` sends no credentials
    #[serde(
        default = "default_api_key_env",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key_env: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_class_name() -> String {
    "VideoText".to_string()
}

fn default_alpha() -> f32 {
    0.5
}

fn default_properties() -> Vec<String> {
    ["title", "description", "keywords", "content"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_key_env() -> Option<String> {
    Some("WEAVIATE_API_KEY".to_string())
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl WeaviateConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            class_name: default_class_name(),
            alpha: default_alpha(),
            properties: default_properties(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("url must not be empty".to_string());
        }

        let class_is_identifier = self
            .class_name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self
                .class_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !class_is_identifier {
            return Err(format!("invalid class_name '{}'", self.class_name));
        }

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err("alpha must be between 0.0 and 1.0".to_string());
        }

        if self.properties.is_empty() {
            return Err("properties must not be empty".to_string());
        }

        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".to_string());
        }

        Ok(())
    }
}

/// [`HybridTextSearch`] over the Weaviate GraphQL API
#[derive(Clone)]
pub struct WeaviateHybridClient {
    http: reqwest::Client,
    config: WeaviateConfig,
    api_key: Option<String>,
}

impl WeaviateHybridClient {
    /// Build a client, reading the API key from `config.api_key_env`
    pub fn new(config: WeaviateConfig) -> Result<Self> {
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() && config.api_key_env.is_some() {
            warn!("No Weaviate API key found; sending unauthenticated requests");
        }

        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: WeaviateConfig, api_key: Option<String>) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        info!(
            "Weaviate hybrid client for class '{}' at {}",
            config.class_name, config.url
        );

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &WeaviateConfig {
        &self.config
    }

    fn graphql_url(&self) -> String {
        format!("{}/v1/graphql", self.config.url.trim_end_matches('/'))
    }

    fn build_query(
        &self,
        query_text: &str,
        query_vector: &[f32],
        candidate_video_ids: &BTreeSet<String>,
        limit: usize,
    ) -> Result<String> {
        let query = serde_json::to_string(query_text).map_err(encode_error)?;
        let vector = serde_json::to_string(query_vector).map_err(encode_error)?;
        let properties = serde_json::to_string(&self.config.properties).map_err(encode_error)?;
        let video_ids = serde_json::to_string(candidate_video_ids).map_err(encode_error)?;

        Ok(format!(
            "{{ Get {{ {class}(hybrid: {{ query: {query}, vector: {vector}, alpha: {alpha}, \
             properties: {properties} }}, where: {{ path: [\"{VIDEO_ID_PROPERTY}\"], \
             operator: ContainsAny, valueText: {video_ids} }}, limit: {limit}) \
             {{ {VIDEO_ID_PROPERTY} _additional {{ score }} }} }} }}",
            class = self.config.class_name,
            alpha = self.config.alpha,
        ))
    }

    fn parse_scores(&self, body: GraphQlResponse) -> Result<HashMap<String, f32>> {
        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(RetrievalError::HybridSearch(messages.join("; ")));
        }

        let objects = body
            .data
            .as_ref()
            .and_then(|data| data.get("Get"))
            .and_then(|get| get.get(&self.config.class_name))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RetrievalError::HybridSearch(format!(
                    "response has no Get.{} array",
                    self.config.class_name
                ))
            })?;

        let mut scores = HashMap::new();
        for object in objects {
            let Some(video_id) = object.get(VIDEO_ID_PROPERTY).and_then(Value::as_str) else {
                continue;
            };
            let score = object
                .get("_additional")
                .and_then(|additional| additional.get("score"))
                .and_then(parse_score)
                .unwrap_or(0.0);

            // One document per video is expected; keep the best if there are several
            scores
                .entry(video_id.to_string())
                .and_modify(|best: &mut f32| *best = best.max(score))
                .or_insert(score);
        }
        Ok(scores)
    }
}

#[async_trait]
impl HybridTextSearch for WeaviateHybridClient {
    async fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: &[f32],
        candidate_video_ids: &BTreeSet<String>,
        top_k: usize,
    ) -> Result<HashMap<String, f32>> {
        if candidate_video_ids.is_empty() || top_k == 0 {
            return Ok(HashMap::new());
        }

        let query = self.build_query(query_text, query_vector, candidate_video_ids, top_k)?;
        debug!(
            "Weaviate hybrid query over {} candidate videos",
            candidate_video_ids.len()
        );

        let mut request = self
            .http
            .post(self.graphql_url())
            .json(&GraphQlRequest { query: &query });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let body: GraphQlResponse = request.send().await?.error_for_status()?.json().await?;
        let scores = self.parse_scores(body)?;

        info!("Weaviate returned {} matching videos", scores.len());
        Ok(scores)
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Weaviate reports hybrid scores as strings
fn parse_score(value: &Value) -> Option<f32> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    }
}

fn encode_error(err: serde_json::Error) -> RetrievalError {
    RetrievalError::HybridSearch(format!("failed to encode query: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client() -> WeaviateHybridClient {
        WeaviateHybridClient::with_api_key(WeaviateConfig::new("http://localhost:8080/"), None)
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = WeaviateConfig::new("http://localhost:8080");
        assert!(config.validate().is_ok());
        assert_eq!(config.class_name, "VideoText");
        assert_eq!(config.alpha, 0.5);
        assert_eq!(
            config.properties,
            vec!["title", "description", "keywords", "content"]
        );
    }

    #[test]
    fn test_invalid_config() {
        let mut config = WeaviateConfig::new("http://localhost:8080");
        config.class_name = "Video Text { }".to_string();
        assert!(config.validate().is_err());

        let mut config = WeaviateConfig::new("http://localhost:8080");
        config.alpha = 1.5;
        assert!(config.validate().is_err());

        assert!(WeaviateConfig::new(" ").validate().is_err());
    }

    #[test]
    fn test_query_escapes_text() {
        let ids = BTreeSet::from(["K01_V001".to_string(), "K02_V003".to_string()]);
        let query = client()
            .build_query("xe \"đỏ\"", &[0.5, -1.0], &ids, 2)
            .unwrap();

        assert!(query.contains(r#"query: "xe \"đỏ\"""#));
        assert!(query.contains("vector: [0.5,-1.0]"));
        assert!(query.contains(r#"valueText: ["K01_V001","K02_V003"]"#));
        assert!(query.contains("limit: 2"));
        assert!(query.contains("VideoText(hybrid:"));
    }

    #[test]
    fn test_graphql_url_trims_slash() {
        assert_eq!(client().graphql_url(), "http://localhost:8080/v1/graphql");
    }

    #[test]
    fn test_parse_scores() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "data": {"Get": {"VideoText": [
                {"video_id": "K01_V001", "_additional": {"score": "0.75"}},
                {"video_id": "K01_V001", "_additional": {"score": "0.25"}},
                {"video_id": "K02_V003", "_additional": {"score": 0.5}},
                {"_additional": {"score": "0.9"}}
            ]}}
        }))
        .unwrap();

        let scores = client().parse_scores(body).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["K01_V001"], 0.75);
        assert_eq!(scores["K02_V003"], 0.5);
    }

    #[test]
    fn test_parse_graphql_errors() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "data": {"Get": {"VideoText": null}},
            "errors": [{"message": "no such class"}]
        }))
        .unwrap();

        let err = client().parse_scores(body).unwrap_err();
        assert!(matches!(err, RetrievalError::HybridSearch(msg) if msg == "no such class"));
    }
}
