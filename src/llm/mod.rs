
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{LlmConfig, get_api_key};
use crate::{QaError, Result};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant answering based only on the provided context.";

/// Produces an answer to `question` from the retrieved `context`.
pub trait Generator {
    fn generate(&self, context: &str, question: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    api_url: Url,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl ChatClient {
    /// Resolve the API key from the configured environment variable
    #[inline]
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = get_api_key(&config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| QaError::Config(format!("Invalid LLM API URL {}: {}", config.api_url, e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            api_url,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!("Context:\n{}\n\nQuestion: {}", context, question),
            },
        ]
    }
}

impl Generator for ChatClient {
    #[inline]
    fn generate(&self, context: &str, question: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(context, question),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| QaError::Llm(format!("Failed to serialize chat request: {}", e)))?;

        debug!(
            "Requesting completion from {} with {} characters of context",
            self.model,
            context.chars().count()
        );

        let response_text = self
            .agent
            .post(self.api_url.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| QaError::from_http("LLM API", &e))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Llm(format!("Failed to parse chat response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| QaError::Llm("Chat response contained no choices".to_string()))
    }
}
