//! # LLM Module
//!
//! The text-generation capability used for per-iteration analysis and the
//! final synthesis, plus its Ollama implementation built on Rig.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Errors from a [`TextGenerator`].
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Completion failed: {0}")]
    Completion(String),
}

/// A single prompt-in, text-out request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,

    /// Output allowance in tokens; `None` leaves the provider default
    pub max_output_tokens: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, tokens: u64) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

/// Text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `request`, returning the raw model output.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Build an Ollama client pointed at `host`.
///
/// Rig's Ollama client reads its base URL from `OLLAMA_API_BASE_URL`.
pub fn ollama_client(host: &str) -> ollama::Client {
    std::env::set_var("OLLAMA_API_BASE_URL", host);
    ollama::Client::from_env()
}

/// [`TextGenerator`] backed by a local Ollama model.
pub struct OllamaGenerator {
    client: ollama::Client,
    model: String,
    temperature: f64,
}

impl OllamaGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: ollama_client(&config.ollama_host),
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            max_output_tokens = ?request.max_output_tokens,
            "Requesting completion"
        );

        let mut builder = self
            .client
            .agent(&self.model)
            .temperature(self.temperature);
        if let Some(max_tokens) = request.max_output_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        let agent = builder.build();

        agent
            .prompt(&request.prompt)
            .await
            .map_err(|e| GenerationError::Completion(e.to_string()))
    }
}
