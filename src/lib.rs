//! # Deep Research Agent
//!
//! A bounded iterative research loop: search the web, extract content from the
//! top results, let a language model analyze the findings and decide whether to
//! continue, then synthesize a long-form answer.
//!
//! The loop itself lives in [`orchestrator`]. It only depends on the capability
//! traits [`WebSearch`], [`ContentExtractor`] and [`TextGenerator`]; concrete
//! Firecrawl and Ollama implementations are provided in [`tools`] and [`llm`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use deep_research::{FirecrawlClient, OllamaGenerator, ResearchOrchestrator, Config};
//!
//! let config = Config::from_env()?;
//! let firecrawl = Arc::new(FirecrawlClient::new("fc-key", "https://api.firecrawl.dev"));
//! let orchestrator = ResearchOrchestrator::new(
//!     firecrawl.clone(),
//!     firecrawl,
//!     Arc::new(OllamaGenerator::new(&config)),
//! );
//! let answer = orchestrator.run_deep_research("what is the cause of insomnia", 1).await?;
//! ```

pub mod agent;
pub mod analysis;
pub mod config;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod state;
pub mod tools;

pub use agent::{DeepResearchArgs, DeepResearchTool, ResearchAgent};
pub use analysis::{parse_analysis, AnalysisResult};
pub use config::{Config, ResearchConfig};
pub use error::ResearchError;
pub use llm::{GenerationError, GenerationRequest, OllamaGenerator, TextGenerator};
pub use orchestrator::{ResearchOrchestrator, DEFAULT_MAX_DEPTH};
pub use state::{Finding, LoopControl, ResearchPhase, ResearchReport, ResearchState, StopReason};
pub use tools::{
    ContentExtractor, ExtractError, ExtractPayload, FirecrawlClient, SearchError, SearchHit,
    WebSearch,
};
