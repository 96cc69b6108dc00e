//! # Configuration Module
//!
//! Two layers of configuration:
//! - [`Config`]: deployment settings loaded from environment variables
//!   (model, endpoints, API keys, default research depth)
//! - [`ResearchConfig`]: the research loop's budgets. These are fixed
//!   defaults, not read from the environment, but can be overridden in code.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::orchestrator::DEFAULT_MAX_DEPTH;

/// Wall-clock ceiling on one research run, checked between iterations
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(90_000);

/// Failed searches/analyses tolerated before the loop gives up
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 3;

/// Search results extracted per iteration
pub const DEFAULT_TOP_URLS: usize = 3;

/// Progress steps accounted per iteration
pub const STEPS_PER_DEPTH: usize = 5;

/// Output allowance for the final synthesis call
pub const DEFAULT_SYNTHESIS_MAX_TOKENS: u64 = 8192;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the research agent.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model to use (e.g., "llama3.2", "qwen2.5")
    pub model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Temperature for LLM responses (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Firecrawl API key used for search and extraction
    pub firecrawl_api_key: Option<String>,

    /// Firecrawl API base URL
    pub firecrawl_api_url: String,

    /// Research iterations per question
    pub max_depth: usize,

    /// Log level for the application
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.7,
            firecrawl_api_key: None,
            firecrawl_api_url: "https://api.firecrawl.dev".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first when present. Unset variables keep their
    /// defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Ok(val) = env::var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Ok(val) = env::var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?;
        }

        if let Ok(val) = env::var("FIRECRAWL_API_KEY") {
            config.firecrawl_api_key = Some(val).filter(|key| !key.is_empty());
        }

        if let Ok(val) = env::var("FIRECRAWL_API_URL") {
            config.firecrawl_api_url = val;
        }

        if let Ok(val) = env::var("RESEARCH_MAX_DEPTH") {
            config.max_depth = val
                .parse()
                .context("RESEARCH_MAX_DEPTH must be a valid positive integer")?;
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_depth == 0 {
            anyhow::bail!("RESEARCH_MAX_DEPTH must be at least 1");
        }

        if self.model.is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        if self.firecrawl_api_key.is_none() {
            anyhow::bail!("FIRECRAWL_API_KEY is not set");
        }

        Ok(())
    }
}

// =============================================================================
// RESEARCH LOOP BUDGETS
// =============================================================================
/// Budgets and limits for one research run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    pub time_limit: Duration,
    pub max_failed_attempts: u32,
    pub top_urls: usize,
    pub steps_per_depth: usize,
    /// Output allowance for analysis calls; `None` uses the provider default
    pub analysis_max_tokens: Option<u64>,
    pub synthesis_max_tokens: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            top_urls: DEFAULT_TOP_URLS,
            steps_per_depth: STEPS_PER_DEPTH,
            analysis_max_tokens: None,
            synthesis_max_tokens: DEFAULT_SYNTHESIS_MAX_TOKENS,
        }
    }
}

impl ResearchConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    pub fn with_top_urls(mut self, count: usize) -> Self {
        self.top_urls = count;
        self
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            firecrawl_api_key: Some("fc-test".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.firecrawl_api_url, "https://api.firecrawl.dev");
        assert_eq!(config.max_depth, 1);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_api_key() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let mut config = valid_config();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_depth() {
        let mut config = valid_config();
        config.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_research_config_defaults() {
        let research = ResearchConfig::default();

        assert_eq!(research.time_limit, Duration::from_secs(90));
        assert_eq!(research.max_failed_attempts, 3);
        assert_eq!(research.top_urls, 3);
        assert_eq!(research.steps_per_depth, 5);
        assert_eq!(research.synthesis_max_tokens, 8192);
    }
}
