use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to load resources: {0}")]
    Resource(String),

    #[error("{var} environment variable not set.")]
    MissingApiKey { var: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl QaError {
    /// Map a `ureq` failure into a network error tagged with the service that failed.
    #[inline]
    pub fn from_http(service: &str, error: &ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status) => {
                Self::Network(format!("{} request failed: HTTP {}", service, status))
            }
            other => Self::Network(format!("{} request failed: {}", service, other)),
        }
    }
}

pub mod config;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod web;
