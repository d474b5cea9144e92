
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Neighbor, VectorIndex};
use crate::config::{HostedIndexConfig, get_api_key};
use crate::{QaError, Result};

const API_VERSION: &str = "2024-07";

/// Pinecone data-plane client. Vector ids are the decimal ordinals of the documents.
#[derive(Debug, Clone)]
pub struct HostedIndex {
    query_url: Url,
    namespace: Option<String>,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
}

impl HostedIndex {
    #[inline]
    pub fn new(config: &HostedIndexConfig) -> Result<Self> {
        let api_key = get_api_key(&config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &HostedIndexConfig, api_key: String) -> Result<Self> {
        let host = config
            .host_url()
            .map_err(|e| QaError::Config(format!("Invalid hosted index host: {}", e)))?;
        let query_url = host
            .join("/query")
            .map_err(|e| QaError::Config(format!("Failed to build query URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            query_url,
            namespace: config.namespace.clone(),
            api_key,
            agent,
        })
    }
}

impl VectorIndex for HostedIndex {
    #[inline]
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let request = QueryRequest {
            vector: query,
            top_k: k,
            include_values: false,
            include_metadata: false,
            namespace: self.namespace.as_deref(),
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| QaError::Index(format!("Failed to serialize query: {}", e)))?;

        debug!("Querying hosted index at {}", self.query_url);

        let response_text = self
            .agent
            .post(self.query_url.as_str())
            .header("Api-Key", self.api_key.as_str())
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| QaError::from_http("Vector search", &e))?;

        let response: QueryResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Index(format!("Failed to parse query response: {}", e)))?;

        let neighbors: Vec<Neighbor> = response
            .matches
            .into_iter()
            .filter_map(|m| match m.id.trim().parse::<i64>() {
                Ok(ordinal) => Some(Neighbor {
                    ordinal,
                    score: m.score,
                }),
                Err(_) => {
                    warn!("Dropping match with non-ordinal id {:?}", m.id);
                    None
                }
            })
            .take(k)
            .collect();

        debug!("Hosted search returned {} neighbors", neighbors.len());
        Ok(neighbors)
    }
}
