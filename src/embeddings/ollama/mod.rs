
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::Embedder;
use crate::config::OllamaConfig;
use crate::{QaError, Result};

/// Output size of all-MiniLM-L6-v2
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    dimension: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| QaError::Config(format!("Failed to generate Ollama URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.embedding_dimension,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping()?;
        self.validate_model()?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("/api/tags")?;

        debug!("Pinging Ollama server at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| QaError::from_http("Ollama", &e))?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured model is available
    #[inline]
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.model);

        let models = self.list_models()?;

        if models.iter().any(|m| model_matches(&m.name, &self.model)) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(QaError::Embedding(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available_models
            )))
        }
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| QaError::from_http("Ollama", &e))?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Embedding(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate the embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let url = self.endpoint("/api/embed")?;

        let request_json = serde_json::to_string(&request).map_err(|e| {
            QaError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| QaError::from_http("Ollama", &e))?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            QaError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = embed_response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| QaError::Embedding("Ollama returned no embeddings".to_string()))?;

        if embedding.len() != self.dimension as usize {
            warn!(
                "Model {} produced {} dimensions, configured for {}",
                self.model,
                embedding.len(),
                self.dimension
            );
        }

        debug!("Generated embedding with {} dimensions", embedding.len());

        Ok(embedding)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| QaError::Config(format!("Failed to build Ollama URL {}: {}", path, e)))
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text)
    }
}

/// Ollama reports `all-minilm:latest` for a model pulled as `all-minilm`
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || (!wanted.contains(':') && available.strip_suffix(":latest") == Some(wanted))
}
