#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_dimension: u32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_seconds: 30,
        }
    }
}

/// Chat-completion endpoint settings. Any OpenAI-compatible API works; Groq is the default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key, never the key itself
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.5,
            max_tokens: 512,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Flat,
    Hosted,
}

impl std::fmt::Display for IndexBackend {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Hosted => f.write_str("hosted"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub documents_path: PathBuf,
    /// Only read by the flat backend
    pub index_path: PathBuf,
    pub hosted: HostedIndexConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Flat,
            documents_path: PathBuf::from("documents.json"),
            index_path: PathBuf::from("faiss_index.index"),
            hosted: HostedIndexConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostedIndexConfig {
    /// Data-plane host of the index, e.g. `https://docs-abc123.svc.us-east-1.pinecone.io`
    pub host: String,
    pub namespace: Option<String>,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for HostedIndexConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            namespace: None,
            api_key_env: "PINECONE_API_KEY".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid API key variable: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid max tokens: {0} (must be between 1 and 32768)")]
    InvalidMaxTokens(u32),
    #[error("Invalid top k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid max context length: {0} (must be between 100 and 100000 characters)")]
    InvalidMaxContextChars(usize),
    #[error("Hosted index host must be set when the hosted backend is selected")]
    MissingHostedIndexHost,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Get the configuration directory path
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".support-qa"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("support-qa"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default configuration directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_from(config_dir)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when the file is absent
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: Some(config_dir.as_ref().to_path_buf()),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = Some(config_dir.as_ref().to_path_buf());

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir()?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }

    #[inline]
    pub fn config_file_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.get_base_dir()?.join("config.toml"))
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.llm.validate()?;
        self.retrieval.validate()?;
        self.index.validate()?;
        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}://{}:{}",
                self.protocol, self.host, self.port
            )));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        validate_timeout(self.timeout_seconds)
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url =
            Url::parse(&self.api_url).map_err(|_| ConfigError::InvalidUrl(self.api_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=32768).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        validate_timeout(self.timeout_seconds)
    }

    pub fn set_api_url(&mut self, api_url: String) -> Result<(), ConfigError> {
        let temp_config = LlmConfig {
            api_url: api_url.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.api_url = api_url;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<(), ConfigError> {
        if !(1..=32768).contains(&max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(max_tokens));
        }
        self.max_tokens = max_tokens;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(100..=100_000).contains(&self.max_context_chars) {
            return Err(ConfigError::InvalidMaxContextChars(self.max_context_chars));
        }

        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }

    pub fn set_max_context_chars(&mut self, max_context_chars: usize) -> Result<(), ConfigError> {
        if !(100..=100_000).contains(&max_context_chars) {
            return Err(ConfigError::InvalidMaxContextChars(max_context_chars));
        }
        self.max_context_chars = max_context_chars;
        Ok(())
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == IndexBackend::Hosted {
            self.hosted.validate()?;
        }
        Ok(())
    }
}

impl HostedIndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHostedIndexHost);
        }

        self.host_url()?;

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }

    /// Parse the host, assuming https when no scheme is given
    pub fn host_url(&self) -> Result<Url, ConfigError> {
        let host = self.host.trim();
        let url_str = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}
